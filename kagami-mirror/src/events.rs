//! ミラーフレームワークのイベント
//!
//! いずれもペイロードを持たない合図であり、受け手はイベントから値を
//! 受け取るのではなく、オーケストレータのエンティティへ現在値を
//! 問い直します。

use kagami_sched::{EventId, Scheduler};

/// プロセス全体で共有するイベントの一式
#[derive(Debug, Clone, Copy)]
pub struct MirrorEvents {
    /// 静的アドレスの解決が完了し、各ルートへ配布できる
    pub controller_ready: EventId,
    /// 対象プロセスが終了した
    pub process_closed: EventId,
    /// エリア変更を検出した
    pub area_changed: EventId,
    /// 粗い状態（ゲーム状態）が変化した
    pub state_changed: EventId,
}

impl MirrorEvents {
    /// スケジューラにイベントを登録する
    pub fn register(sched: &Scheduler) -> Self {
        Self {
            controller_ready: sched.event("ControllerReady"),
            process_closed: sched.event("ProcessClosed"),
            area_changed: sched.event("AreaChangeDetected"),
            state_changed: sched.event("StateChanged"),
        }
    }
}
