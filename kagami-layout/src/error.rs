//! 外部メモリ読み取りのエラー型

use thiserror::Error;

/// 外部プロセスのメモリ読み取りで発生するエラー
///
/// いずれのエラーもエンティティ境界で吸収され、スケジューラへは
/// 伝播しません（協調タスク内の未処理エラーは他タスクを巻き込むため）。
#[derive(Debug, Error)]
pub enum ReadError {
    /// アドレスが対象プロセスにマップされていない
    #[error("address 0x{0:x} is not mapped in the foreign process")]
    Unmapped(u64),

    /// 対象プロセスが終了している
    #[error("foreign process has exited")]
    ProcessExited,

    /// 対象プロセスのメモリへのアクセスが拒否された
    #[error("access to foreign memory denied")]
    AccessDenied,

    /// 要求したバイト数を読み取れなかった
    #[error("short read at 0x{addr:x}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        addr: u64,
        wanted: usize,
        got: usize,
    },

    /// デコードした外部レイアウトが妥当性検査を通らなかった
    #[error("implausible foreign layout at 0x{addr:x}: {reason}")]
    BadLayout { addr: u64, reason: &'static str },
}
