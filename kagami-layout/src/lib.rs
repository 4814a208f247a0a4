//! Kagami 外部プロセスメモリのレイアウト解釈
//!
//! このクレートは、観測対象プロセスのアドレス空間を型付きで読み取るための
//! 抽象を提供します。固定オフセットのレイアウト記述子、外部プロセス内の
//! 順序付きマップ（MSVC std::map）、ワイド文字列バッファ（MSVC std::wstring）
//! のデコードを行います。書き込みは一切行いません。

pub mod addr;
pub mod error;
pub mod reader;
pub mod scalar;
pub mod stdmap;
pub mod wstring;

pub use addr::Addr;
pub use error::ReadError;
pub use reader::{ForeignRead, ForeignReadExt, RemoteLayout};
pub use scalar::Scalar;
pub use stdmap::read_std_map;
pub use wstring::{read_std_wstring, StdWString};

#[cfg(test)]
pub(crate) mod test_image;
