//! アドレス追跡エンティティの共通契約
//!
//! 観測対象プロセス内のオブジェクトを写し取るエンティティは、外部
//! アドレスとデコード済みキャッシュを 1 組ずつ持ちます。キャッシュが
//! 有効なのはアドレスが番兵でない間だけで、アドレスが別の非番兵値へ
//! 遷移したときは読み直しが完了するまでキャッシュを参照してはいけません。

use kagami_layout::{Addr, ForeignRead};

/// アドレス追跡エンティティの能力契約
///
/// [`set_address`](Remote::set_address) がアドレス変更検出プロトコルの
/// 本体です。具象エンティティは保存・更新・消去の 3 操作を実装します。
pub trait Remote {
    /// 現在の外部アドレス
    fn address(&self) -> Addr;

    /// アドレスを保存する（更新・消去は行わない）
    fn store_address(&mut self, addr: Addr);

    /// 現在のアドレスからキャッシュを更新する
    ///
    /// `address_changed` が偽の場合は同一アドレスでの再読み取り
    /// （対象側の値変化の拾い直し）を意味します。実装はアドレスが
    /// 番兵のとき読み取りを試みてはいけません。読み取り失敗は実装内で
    /// 吸収し、キャッシュを更新前の値か番兵のまま残します。
    fn refresh(&mut self, reader: &dyn ForeignRead, address_changed: bool);

    /// キャッシュを空値（番兵）に戻す
    ///
    /// 保存済みアドレスまで消すかどうかはエンティティごとの方針です。
    fn clear(&mut self);

    /// アドレスを設定し、変化に応じて更新または消去する
    ///
    /// 同値の再設定は何もしません（再デコードも発生しない）。
    fn set_address(&mut self, reader: &dyn ForeignRead, new: Addr) {
        if new == self.address() {
            return;
        }
        self.store_address(new);
        if new.is_null() {
            self.clear();
        } else {
            self.refresh(reader, true);
        }
    }
}
