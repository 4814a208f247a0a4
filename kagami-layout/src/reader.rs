//! 外部メモリリーダーの抽象
//!
//! 上位層（ミラーフレームワーク）はこのトレイト経由でのみ外部メモリに
//! 触れます。実装はプロセス実体（/proc/pid/mem）でもテスト用のメモリ
//! イメージでも構いません。
//!
//! 読み取りは常にベストエフォートの単発スナップショットであり、複数
//! フィールドにまたがる一貫性は保証されません。対象プロセスは読み取りと
//! 並行してメモリを書き換え・解放し得ます。

use crate::{Addr, ReadError, Scalar};

/// 外部プロセスのメモリを読み取るインターフェース
pub trait ForeignRead {
    /// 指定アドレスから len バイトを読み取る
    fn read_bytes(&self, addr: Addr, len: usize) -> Result<Vec<u8>, ReadError>;
}

/// 固定オフセットレイアウトとしてデコード可能な型
///
/// 対象プロセスのバイト領域を、フィールドごとの明示的なバイトオフセットで
/// 解釈します（パッキング 1、リトルエンディアン、8 バイトポインタ）。
/// レイアウト定義は [`remote_layout!`](crate::remote_layout) マクロで
/// 純データとして記述し、デコードエンジン本体には触れません。
pub trait RemoteLayout: Sized {
    /// レイアウト全体のサイズ（バイト数）
    const SIZE: usize;

    /// バイト列からレイアウトをデコードする
    fn decode(bytes: &[u8]) -> Result<Self, ReadError>;
}

impl<T: Scalar> RemoteLayout for T {
    const SIZE: usize = T::SIZE;

    fn decode(bytes: &[u8]) -> Result<Self, ReadError> {
        T::from_le_bytes(bytes)
    }
}

/// [`ForeignRead`] の型付き読み取り拡張
pub trait ForeignReadExt: ForeignRead {
    /// 指定アドレスのレイアウトをデコードして返す
    fn read_layout<T: RemoteLayout>(&self, addr: Addr) -> Result<T, ReadError> {
        if addr.is_null() {
            return Err(ReadError::Unmapped(0));
        }
        let bytes = self.read_bytes(addr, T::SIZE)?;
        T::decode(&bytes)
    }
}

impl<R: ForeignRead + ?Sized> ForeignReadExt for R {}

/// 固定オフセットレイアウトを純データとして定義するマクロ
///
/// フィールドごとにバイトオフセットと型を明示します。デコードは
/// [`Scalar::read_at`] の一本に集約されるため、対象プログラムの
/// バージョン更新でオフセット表を差し替えてもデコードエンジンは
/// 変更不要です。
///
/// # Examples
/// ```
/// use kagami_layout::{remote_layout, Addr, RemoteLayout};
///
/// remote_layout! {
///     pub struct ExampleOffset: 0x10 {
///         0x00 => next: Addr,
///         0x08 => count: u32,
///     }
/// }
///
/// let mut bytes = vec![0u8; 0x10];
/// bytes[0x08] = 7;
/// let decoded = ExampleOffset::decode(&bytes).unwrap();
/// assert_eq!(decoded.count, 7);
/// ```
#[macro_export]
macro_rules! remote_layout {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $size:literal {
            $( $offset:expr => $field:ident : $fty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        $vis struct $name {
            $( pub $field: $fty, )*
        }

        impl $crate::RemoteLayout for $name {
            const SIZE: usize = $size;

            fn decode(bytes: &[u8]) -> Result<Self, $crate::ReadError> {
                Ok(Self {
                    $( $field: <$fty as $crate::Scalar>::read_at(bytes, $offset)?, )*
                })
            }
        }
    };
}
