//! 外部プロセス内のワイド文字列（MSVC std::wstring）のデコード
//!
//! MSVC x64 の std::wstring はヘッダ 0x20 バイトで、先頭 0x10 バイトが
//! インラインバッファとヒープポインタの共用体、0x10 に長さ（UTF-16
//! 単位数）、0x18 に容量を持ちます。容量が 8 以上ならバッファは
//! ポインタとして解釈します。

use widestring::U16Str;

use crate::{Addr, ForeignRead, ForeignReadExt, ReadError, RemoteLayout, Scalar};

/// 長さの妥当性上限（UTF-16 単位数）
///
/// オフセット表のずれで巨大な長さを読んだ場合に備える。超過は
/// [`ReadError::BadLayout`] になる。
pub const MAX_WSTRING_UNITS: u64 = 0x1000;

/// インラインバッファに収まる最大単位数（終端 NUL を除く 7 文字）
const INLINE_CAPACITY: u64 = 7;

/// std::wstring のヘッダ
#[derive(Debug, Clone, Copy)]
pub struct StdWString {
    buffer: [u8; 16],
    length: u64,
    capacity: u64,
}

impl RemoteLayout for StdWString {
    const SIZE: usize = 0x20;

    fn decode(bytes: &[u8]) -> Result<Self, ReadError> {
        if bytes.len() < Self::SIZE {
            return Err(ReadError::ShortRead {
                addr: 0,
                wanted: Self::SIZE,
                got: bytes.len(),
            });
        }
        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&bytes[0x00..0x10]);
        Ok(Self {
            buffer,
            length: u64::read_at(bytes, 0x10)?,
            capacity: u64::read_at(bytes, 0x18)?,
        })
    }
}

impl StdWString {
    /// 文字列の長さ（UTF-16 単位数）
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// ヘッダの指す文字列本体を読み取ってデコードする
    ///
    /// ヒープ格納の場合はバッファポインタの先を追加で読み取ります。
    /// 不正な UTF-16 は置換文字に落とします。
    pub fn read(&self, reader: &dyn ForeignRead) -> Result<String, ReadError> {
        if self.length == 0 {
            return Ok(String::new());
        }
        if self.length > MAX_WSTRING_UNITS {
            return Err(ReadError::BadLayout {
                addr: 0,
                reason: "wstring length over sanity bound",
            });
        }

        let byte_len = self.length as usize * 2;
        let raw = if self.capacity > INLINE_CAPACITY {
            let ptr = Addr(<u64 as Scalar>::from_le_bytes(&self.buffer[0..8])?);
            if ptr.is_null() {
                return Err(ReadError::BadLayout {
                    addr: 0,
                    reason: "heap wstring with null buffer pointer",
                });
            }
            reader.read_bytes(ptr, byte_len)?
        } else {
            if self.length > INLINE_CAPACITY {
                return Err(ReadError::BadLayout {
                    addr: 0,
                    reason: "inline wstring longer than inline capacity",
                });
            }
            self.buffer[..byte_len].to_vec()
        };

        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(U16Str::from_slice(&units).to_string_lossy())
    }
}

/// 指定アドレスの std::wstring を読み取ってデコードする
pub fn read_std_wstring(reader: &dyn ForeignRead, addr: Addr) -> Result<String, ReadError> {
    let header: StdWString = reader.read_layout(addr)?;
    header.read(reader)
}
