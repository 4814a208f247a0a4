//! テスト用のスパースなメモリイメージ

use std::cell::RefCell;
use std::collections::HashMap;

use crate::{Addr, ForeignRead, ReadError};

/// バイト単位で構築できる疑似メモリイメージ
pub struct Image {
    bytes: RefCell<HashMap<u64, u8>>,
}

impl Image {
    pub fn new() -> Self {
        Self {
            bytes: RefCell::new(HashMap::new()),
        }
    }

    pub fn put(&self, addr: Addr, data: &[u8]) {
        let mut bytes = self.bytes.borrow_mut();
        for (i, b) in data.iter().enumerate() {
            bytes.insert(addr.0 + i as u64, *b);
        }
    }

    pub fn put_u64(&self, addr: Addr, value: u64) {
        self.put(addr, &value.to_le_bytes());
    }

    pub fn put_u8(&self, addr: Addr, value: u8) {
        self.put(addr, &[value]);
    }

    pub fn put_i32(&self, addr: Addr, value: i32) {
        self.put(addr, &value.to_le_bytes());
    }

    /// UTF-16 文字列バッファを書き込む
    pub fn put_utf16(&self, addr: Addr, text: &str) {
        let units: Vec<u16> = text.encode_utf16().collect();
        for (i, unit) in units.iter().enumerate() {
            self.put(addr.offset(i as u64 * 2), &unit.to_le_bytes());
        }
    }
}

impl ForeignRead for Image {
    fn read_bytes(&self, addr: Addr, len: usize) -> Result<Vec<u8>, ReadError> {
        let bytes = self.bytes.borrow();
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            match bytes.get(&(addr.0 + i as u64)) {
                Some(b) => out.push(*b),
                None => return Err(ReadError::Unmapped(addr.0 + i as u64)),
            }
        }
        Ok(out)
    }
}
