//! Kagami 観測対象プロセスへのアクセス
//!
//! このクレートは、観測対象プロセスのメモリを /proc/pid/mem 経由で
//! 読み取るための低レベル機能を提供します。対象プロセスへの書き込みは
//! 行いません（観測専用）。

pub mod memory;

pub use memory::{Memory, MemoryMapping};

/// ターゲットアクセスの結果型
pub type Result<T> = anyhow::Result<T>;
