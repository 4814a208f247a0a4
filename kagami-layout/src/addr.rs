//! 外部プロセス内のアドレス

use std::fmt;

/// 外部プロセスのアドレス空間を指すハンドル
///
/// 弱参照であり、ローカルで参照外しされることはありません。
/// ゼロ値は「不明／利用不可」を表す番兵です。比較は値のみで行います。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Addr(pub u64);

impl Addr {
    /// 番兵値（アドレス未確定）
    pub const NULL: Addr = Addr(0);

    /// 番兵値かどうかを判定する
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// オフセットを加算したアドレスを返す
    pub fn offset(self, delta: u64) -> Addr {
        Addr(self.0.wrapping_add(delta))
    }
}

impl From<u64> for Addr {
    fn from(raw: u64) -> Self {
        Addr(raw)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sentinel() {
        assert!(Addr::NULL.is_null());
        assert!(Addr(0).is_null());
        assert!(!Addr(0x1000).is_null());
    }

    #[test]
    fn test_offset() {
        assert_eq!(Addr(0x1000).offset(0x20), Addr(0x1020));
    }

    #[test]
    fn test_display_hex() {
        assert_eq!(format!("{}", Addr(0xdead)), "0xdead");
    }
}
