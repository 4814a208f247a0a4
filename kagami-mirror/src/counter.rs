//! エリア変更カウンタのミラー
//!
//! 対象プロセス内の固定オフセットに置かれたカウンタを 1 値だけ
//! キャッシュします。空値は最大値の番兵で、正規の値と区別でき、
//! 比較のデフォルトとしても安全です（「データなし」は「非常に大きい」
//! として読める）。

use kagami_layout::{Addr, ForeignRead, ForeignReadExt};
use tracing::debug;

use crate::offsets::AreaChangeOffset;
use crate::remote::Remote;

/// カウンタの空値（番兵）
pub const EMPTY_COUNTER: i32 = i32::MAX;

/// エリア変更カウンタ（細粒度のリモートオブジェクト）
///
/// エリア変更イベントでは同一アドレスのまま再読み取りし、ゲーム状態が
/// ゲーム内相当から外れたときは値だけを番兵へ戻します（アドレスは
/// 読める状態でも値が信頼できないため）。
#[derive(Debug)]
pub struct AreaChangeCounter {
    address: Addr,
    value: i32,
}

impl Default for AreaChangeCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl AreaChangeCounter {
    pub fn new() -> Self {
        Self {
            address: Addr::NULL,
            value: EMPTY_COUNTER,
        }
    }

    /// キャッシュ済みのカウンタ値
    pub fn value(&self) -> i32 {
        self.value
    }
}

impl Remote for AreaChangeCounter {
    fn address(&self) -> Addr {
        self.address
    }

    fn store_address(&mut self, addr: Addr) {
        self.address = addr;
    }

    fn refresh(&mut self, reader: &dyn ForeignRead, _address_changed: bool) {
        if self.address.is_null() {
            return;
        }
        match reader.read_layout::<AreaChangeOffset>(self.address) {
            Ok(data) => self.value = data.counter,
            Err(e) => debug!(address = %self.address, error = %e, "AreaChangeCounter refresh failed"),
        }
    }

    /// 値のみ番兵へ戻す。アドレスは保持する。
    fn clear(&mut self) {
        self.value = EMPTY_COUNTER;
    }
}
