//! Kagami 協調スケジューラ
//!
//! このクレートは、単一スレッドで動くイベント・時間駆動のタスクランナーを
//! 提供します。タスクは明示的な待機点（イベント待ち・時間待ち）でのみ
//! 中断し、1 ステップの実行はプリエンプションなしに完了まで走ります。

pub mod scheduler;

pub use scheduler::{EventId, Scheduler, Step, TaskId};
