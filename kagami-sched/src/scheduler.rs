//! イベント・時間駆動の協調スケジューラ
//!
//! タスクは「1 回呼ばれると 1 ステップ実行し、次の待機を返すクロージャ」
//! として登録します。イベント発火時には、その時点で待機していたタスクを
//! 登録順（FIFO）に実行します。実行中の再待機は次回の発火を待ちます。
//! 異なるイベントを待つタスク同士に順序保証はありません。
//!
//! 時刻は仮想クロックで進めます。[`Scheduler::advance`] が期限の切れた
//! 時間待ちタスクを期限順に実行します。実時間との対応付けは呼び出し側の
//! 責務です。

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::Duration;

use tracing::trace;

/// イベントの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(usize);

/// タスクの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(usize);

/// タスクの 1 ステップが返す次の待機
pub enum Step {
    /// イベントの次回発火を待つ
    WaitEvent(EventId),
    /// 指定時間の経過を待つ
    WaitDuration(Duration),
    /// タスクを終了する
    Finish,
}

type TaskFn = Box<dyn FnMut(&Scheduler) -> Step>;

struct Inner {
    event_names: Vec<&'static str>,
    /// イベントごとの待機列（FIFO）
    waiters: HashMap<EventId, VecDeque<TaskId>>,
    /// 時間待ち（期限、登録順、タスク）の最小ヒープ
    timers: BinaryHeap<Reverse<(Duration, u64, TaskId)>>,
    timer_seq: u64,
    /// 実行中のタスクはスロットから取り出される
    tasks: HashMap<TaskId, Option<TaskFn>>,
    next_task: usize,
    /// ディスパッチ中に発火されたイベントの処理待ち列
    raised: VecDeque<EventId>,
    dispatching: bool,
    now: Duration,
}

/// 協調スケジューラ
///
/// 実行中のタスクから `raise` / `start` を呼び戻せるよう、内部状態は
/// 内部可変性で保持します。全操作は単一スレッド上で行う前提です。
pub struct Scheduler {
    inner: RefCell<Inner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner {
                event_names: Vec::new(),
                waiters: HashMap::new(),
                timers: BinaryHeap::new(),
                timer_seq: 0,
                tasks: HashMap::new(),
                next_task: 0,
                raised: VecDeque::new(),
                dispatching: false,
                now: Duration::ZERO,
            }),
        }
    }

    /// 名前付きイベントを登録してハンドルを返す
    pub fn event(&self, name: &'static str) -> EventId {
        let mut inner = self.inner.borrow_mut();
        let id = EventId(inner.event_names.len());
        inner.event_names.push(name);
        id
    }

    /// イベントの名前を取得する
    pub fn event_name(&self, id: EventId) -> &'static str {
        self.inner.borrow().event_names[id.0]
    }

    /// 仮想クロックの現在時刻
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// 生存しているタスク数
    pub fn task_count(&self) -> usize {
        self.inner.borrow().tasks.len()
    }

    /// 永続タスクを開始する
    ///
    /// タスク本体は実行せず、`initial` の待機で待ち受けに入れます。
    /// 以後、待機が満たされるたびに本体が 1 回呼ばれ、返された [`Step`] で
    /// 再待機します。
    pub fn start<F>(&self, initial: Step, task: F) -> TaskId
    where
        F: FnMut(&Scheduler) -> Step + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = TaskId(inner.next_task);
        inner.next_task += 1;
        inner.tasks.insert(id, Some(Box::new(task)));
        Self::arm(&mut inner, id, initial);
        id
    }

    fn arm(inner: &mut Inner, id: TaskId, step: Step) {
        match step {
            Step::WaitEvent(ev) => {
                inner.waiters.entry(ev).or_default().push_back(id);
            }
            Step::WaitDuration(d) => {
                let seq = inner.timer_seq;
                inner.timer_seq += 1;
                let deadline = inner.now + d;
                inner.timers.push(Reverse((deadline, seq, id)));
            }
            Step::Finish => {
                inner.tasks.remove(&id);
            }
        }
    }

    /// イベントを発火する
    ///
    /// この時点で待機していたタスクを FIFO で実行します。タスク実行中の
    /// 発火は待ち行列に積まれ、外側のディスパッチが順に処理します。
    pub fn raise(&self, ev: EventId) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.raised.push_back(ev);
            if inner.dispatching {
                return;
            }
            inner.dispatching = true;
        }
        self.drain_raised();
        self.inner.borrow_mut().dispatching = false;
    }

    /// 仮想クロックを進め、期限の切れた時間待ちタスクを期限順に実行する
    pub fn advance(&self, dt: Duration) {
        let target = self.inner.borrow().now + dt;

        loop {
            let due = {
                let mut inner = self.inner.borrow_mut();
                match inner.timers.peek() {
                    Some(Reverse((deadline, _, _))) if *deadline <= target => {
                        let Reverse((deadline, _, id)) = inner.timers.pop().unwrap();
                        inner.now = deadline;
                        Some(id)
                    }
                    _ => None,
                }
            };

            let Some(id) = due else {
                break;
            };

            let nested = {
                let mut inner = self.inner.borrow_mut();
                let nested = inner.dispatching;
                inner.dispatching = true;
                nested
            };
            self.fire(id);
            self.drain_raised();
            if !nested {
                self.inner.borrow_mut().dispatching = false;
            }
        }

        self.inner.borrow_mut().now = target;
    }

    /// 発火済みイベントの待ち行列を処理する
    fn drain_raised(&self) {
        loop {
            let batch: Vec<TaskId> = {
                let mut inner = self.inner.borrow_mut();
                let Some(ev) = inner.raised.pop_front() else {
                    break;
                };
                trace!(event = inner.event_names[ev.0], "dispatching event");
                // スナップショットを取る。実行中の再待機は次回発火の対象。
                inner
                    .waiters
                    .get_mut(&ev)
                    .map(std::mem::take)
                    .unwrap_or_default()
                    .into()
            };
            for id in batch {
                self.fire(id);
            }
        }
    }

    /// タスクを 1 ステップ実行し、返された待機で再待機させる
    fn fire(&self, id: TaskId) {
        let task = {
            let mut inner = self.inner.borrow_mut();
            inner.tasks.get_mut(&id).and_then(Option::take)
        };
        let Some(mut task) = task else {
            return;
        };

        let step = task(self);

        let mut inner = self.inner.borrow_mut();
        if inner.tasks.contains_key(&id) {
            inner.tasks.insert(id, Some(task));
            Self::arm(&mut inner, id, step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_fifo_order_per_event() {
        let sched = Scheduler::new();
        let ev = sched.event("E");
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let order = Rc::clone(&order);
            sched.start(Step::WaitEvent(ev), move |_| {
                order.borrow_mut().push(tag);
                Step::WaitEvent(ev)
            });
        }

        sched.raise(ev);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rearm_waits_for_next_occurrence() {
        let sched = Scheduler::new();
        let ev = sched.event("E");
        let count = Rc::new(RefCell::new(0));

        {
            let count = Rc::clone(&count);
            sched.start(Step::WaitEvent(ev), move |_| {
                *count.borrow_mut() += 1;
                Step::WaitEvent(ev)
            });
        }

        // 1 回の発火で 1 回だけ実行される（再待機は次回を待つ）
        sched.raise(ev);
        assert_eq!(*count.borrow(), 1);
        sched.raise(ev);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_raise_from_inside_task() {
        let sched = Scheduler::new();
        let first = sched.event("First");
        let second = sched.event("Second");
        let order = Rc::new(RefCell::new(Vec::new()));

        {
            let order = Rc::clone(&order);
            sched.start(Step::WaitEvent(first), move |s| {
                order.borrow_mut().push("first");
                s.raise(second);
                order.borrow_mut().push("first-done");
                Step::WaitEvent(first)
            });
        }
        {
            let order = Rc::clone(&order);
            sched.start(Step::WaitEvent(second), move |_| {
                order.borrow_mut().push("second");
                Step::WaitEvent(second)
            });
        }

        sched.raise(first);
        // 内側の発火はタスク完了後に処理される
        assert_eq!(*order.borrow(), vec!["first", "first-done", "second"]);
    }

    #[test]
    fn test_duration_waits_fire_in_deadline_order() {
        let sched = Scheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        {
            let order = Rc::clone(&order);
            sched.start(Step::WaitDuration(Duration::from_millis(20)), move |_| {
                order.borrow_mut().push("slow");
                Step::Finish
            });
        }
        {
            let order = Rc::clone(&order);
            sched.start(Step::WaitDuration(Duration::from_millis(10)), move |_| {
                order.borrow_mut().push("fast");
                Step::Finish
            });
        }

        sched.advance(Duration::from_millis(5));
        assert!(order.borrow().is_empty());

        sched.advance(Duration::from_millis(30));
        assert_eq!(*order.borrow(), vec!["fast", "slow"]);
        assert_eq!(sched.task_count(), 0);
    }

    #[test]
    fn test_periodic_duration_task() {
        let sched = Scheduler::new();
        let count = Rc::new(RefCell::new(0));

        {
            let count = Rc::clone(&count);
            sched.start(Step::WaitDuration(Duration::from_millis(10)), move |_| {
                *count.borrow_mut() += 1;
                Step::WaitDuration(Duration::from_millis(10))
            });
        }

        sched.advance(Duration::from_millis(35));
        assert_eq!(*count.borrow(), 3);
    }

    #[test]
    fn test_finish_retires_task() {
        let sched = Scheduler::new();
        let ev = sched.event("E");
        let count = Rc::new(RefCell::new(0));

        {
            let count = Rc::clone(&count);
            sched.start(Step::WaitEvent(ev), move |_| {
                *count.borrow_mut() += 1;
                Step::Finish
            });
        }

        sched.raise(ev);
        sched.raise(ev);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(sched.task_count(), 0);
    }

    #[test]
    fn test_raise_from_timer_task() {
        let sched = Scheduler::new();
        let ev = sched.event("E");
        let hits = Rc::new(RefCell::new(0));

        {
            let hits = Rc::clone(&hits);
            sched.start(Step::WaitEvent(ev), move |_| {
                *hits.borrow_mut() += 1;
                Step::WaitEvent(ev)
            });
        }
        sched.start(Step::WaitDuration(Duration::from_millis(10)), move |s| {
            s.raise(ev);
            Step::WaitDuration(Duration::from_millis(10))
        });

        sched.advance(Duration::from_millis(25));
        assert_eq!(*hits.borrow(), 2);
    }
}
