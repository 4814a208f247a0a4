//! ロード済みファイル表のルートミラー
//!
//! ファイル表そのものの列挙は対象外で、ルートポインタと要素数だけを
//! 写し取ります。

use kagami_layout::{Addr, ForeignRead, ForeignReadExt};
use tracing::debug;

use crate::offsets::FileRootOffset;
use crate::remote::Remote;

/// ファイル表ルートのミラー
#[derive(Debug, Default)]
pub struct FilesRoot {
    address: Addr,
    root: Addr,
    count: u64,
}

impl FilesRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// ファイル表の先頭ノード
    pub fn root(&self) -> Addr {
        self.root
    }

    /// ファイル表の要素数
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Remote for FilesRoot {
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
        match reader.read_layout::<FileRootOffset>(self.address) {
            Ok(data) => {
                self.root = data.root;
                self.count = data.count;
            }
            Err(e) => debug!(address = %self.address, error = %e, "FilesRoot refresh failed"),
        }
    }

    fn clear(&mut self) {
        self.root = Addr::NULL;
        self.count = 0;
    }
}
