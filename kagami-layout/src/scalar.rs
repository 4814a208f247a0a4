//! スカラ値のデコード
//!
//! 外部プロセスから読み取ったバイト列をリトルエンディアンとして解釈します。
//! 対象プロセスの ABI（x64、8 バイトポインタ）に一致することが前提です。

use crate::{Addr, ReadError};

/// バイト列からデコード可能なスカラ型
pub trait Scalar: Sized {
    /// 型のサイズ（バイト数）
    const SIZE: usize;

    /// リトルエンディアンのバイト列から値を構築する
    fn from_le_bytes(bytes: &[u8]) -> Result<Self, ReadError>;

    /// バイト列の指定オフセットから値を読み取る
    ///
    /// 固定オフセットレイアウトのフィールドデコードは全てこの一本に集約されます。
    fn read_at(bytes: &[u8], offset: usize) -> Result<Self, ReadError> {
        let end = offset
            .checked_add(Self::SIZE)
            .ok_or(ReadError::BadLayout {
                addr: 0,
                reason: "field offset overflow",
            })?;
        let slice = bytes.get(offset..end).ok_or(ReadError::ShortRead {
            addr: 0,
            wanted: end,
            got: bytes.len(),
        })?;
        Self::from_le_bytes(slice)
    }
}

macro_rules! impl_scalar {
    ($($ty:ty => $size:expr),+ $(,)?) => {
        $(
            impl Scalar for $ty {
                const SIZE: usize = $size;

                fn from_le_bytes(bytes: &[u8]) -> Result<Self, ReadError> {
                    let array: [u8; $size] =
                        bytes.try_into().map_err(|_| ReadError::ShortRead {
                            addr: 0,
                            wanted: $size,
                            got: bytes.len(),
                        })?;
                    Ok(<$ty>::from_le_bytes(array))
                }
            }
        )+
    };
}

impl_scalar! {
    u8 => 1,
    u16 => 2,
    u32 => 4,
    u64 => 8,
    i32 => 4,
    i64 => 8,
}

impl Scalar for Addr {
    const SIZE: usize = 8;

    fn from_le_bytes(bytes: &[u8]) -> Result<Self, ReadError> {
        Ok(Addr(<u64 as Scalar>::from_le_bytes(bytes)?))
    }
}
