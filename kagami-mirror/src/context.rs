//! プロセス全体のオーケストレータ
//!
//! プロセス開始時に 1 度だけ構築される明示的なコンテキストです。
//! 最上位の外部アドレス表と 3 つのルートエンティティを所有し、
//! ライフサイクルイベント（ready / closed）とドメインイベント
//! （エリア変更・状態変更）を待つ永続タスクでそれらを駆動します。
//! どのタスクも通常運転では終了せず、アドレスが番兵のときは行儀よく
//! 何もしないことで実質的に無効化されます。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use kagami_layout::{Addr, ForeignRead, ForeignReadExt};
use kagami_sched::{Scheduler, Step};
use tracing::{info, warn};

use crate::counter::AreaChangeCounter;
use crate::events::MirrorEvents;
use crate::files::FilesRoot;
use crate::offsets::AreaChangeOffset;
use crate::remote::Remote;
use crate::states::GameStates;

/// 静的アドレス表のキー
pub const STATES_KEY: &str = "Game States";
pub const FILE_ROOT_KEY: &str = "File Root";
pub const AREA_CHANGE_KEY: &str = "AreaChangeCounter";

/// 変化検出ポーリングの間隔
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// プロセス全体の調整点
///
/// タスクのクロージャはコンテキスト全体ではなく必要なハンドルだけを
/// 複製して捕まえます。スケジューラ自身はタスク引数として渡されるため、
/// 参照循環は生じません。
pub struct Context {
    pub sched: Rc<Scheduler>,
    pub reader: Rc<dyn ForeignRead>,
    pub events: MirrorEvents,
    /// 既知の静的オブジェクトの名前 → アドレス表（アドレス発見側が埋める）
    pub static_addresses: Rc<RefCell<HashMap<String, Addr>>>,
    pub states: Rc<RefCell<GameStates>>,
    pub files: Rc<RefCell<FilesRoot>>,
    pub area_counter: Rc<RefCell<AreaChangeCounter>>,
}

impl Context {
    /// コンテキストを構築する（タスクはまだ開始しない）
    pub fn new(sched: Rc<Scheduler>, reader: Rc<dyn ForeignRead>) -> Self {
        let events = MirrorEvents::register(&sched);
        Self {
            sched,
            reader,
            events,
            static_addresses: Rc::new(RefCell::new(HashMap::new())),
            states: Rc::new(RefCell::new(GameStates::new())),
            files: Rc::new(RefCell::new(FilesRoot::new())),
            area_counter: Rc::new(RefCell::new(AreaChangeCounter::new())),
        }
    }

    /// 静的アドレス表に登録する
    pub fn set_static_address(&self, name: &str, addr: Addr) {
        self.static_addresses
            .borrow_mut()
            .insert(name.to_string(), addr);
    }

    /// 静的アドレス表を引く。未登録は番兵を返す。
    fn lookup_static(table: &RefCell<HashMap<String, Addr>>, name: &str) -> Addr {
        match table.borrow().get(name) {
            Some(addr) => *addr,
            None => {
                warn!(name, "static address not known yet");
                Addr::NULL
            }
        }
    }

    /// 対象プロセスへのアタッチ完了を通知する
    pub fn on_attached(&self) {
        info!("controller ready, distributing static addresses");
        self.sched.raise(self.events.controller_ready);
    }

    /// 対象プロセスの終了を通知する
    pub fn on_closed(&self) {
        info!("foreign process closed, clearing all roots");
        self.sched.raise(self.events.process_closed);
    }

    /// 永続タスク一式を開始する
    ///
    /// 同一イベントの待機は登録順に実行されるため、状態変更では
    /// ディレクトリの種別更新がカウンタのゲート判定より先に走ります。
    pub fn initialize(&self) {
        self.start_ready_tasks();
        self.start_closed_task();
        self.start_state_changed_tasks();
        self.start_area_changed_task();
        self.start_pollers();
    }

    /// ControllerReady で各ルートへ静的アドレスを配る 3 タスク
    fn start_ready_tasks(&self) {
        let ready = self.events.controller_ready;

        let statics = Rc::clone(&self.static_addresses);
        let states = Rc::clone(&self.states);
        let reader = Rc::clone(&self.reader);
        self.sched.start(Step::WaitEvent(ready), move |_| {
            let addr = Self::lookup_static(&statics, STATES_KEY);
            states.borrow_mut().set_address(reader.as_ref(), addr);
            Step::WaitEvent(ready)
        });

        let statics = Rc::clone(&self.static_addresses);
        let files = Rc::clone(&self.files);
        let reader = Rc::clone(&self.reader);
        self.sched.start(Step::WaitEvent(ready), move |_| {
            let addr = Self::lookup_static(&statics, FILE_ROOT_KEY);
            files.borrow_mut().set_address(reader.as_ref(), addr);
            Step::WaitEvent(ready)
        });

        let statics = Rc::clone(&self.static_addresses);
        let counter = Rc::clone(&self.area_counter);
        let reader = Rc::clone(&self.reader);
        self.sched.start(Step::WaitEvent(ready), move |_| {
            let addr = Self::lookup_static(&statics, AREA_CHANGE_KEY);
            counter.borrow_mut().set_address(reader.as_ref(), addr);
            Step::WaitEvent(ready)
        });
    }

    /// ProcessClosed で全ルートを番兵へ戻す（連鎖消去）
    fn start_closed_task(&self) {
        let closed = self.events.process_closed;
        let states = Rc::clone(&self.states);
        let files = Rc::clone(&self.files);
        let counter = Rc::clone(&self.area_counter);
        let reader = Rc::clone(&self.reader);
        self.sched.start(Step::WaitEvent(closed), move |_| {
            states.borrow_mut().set_address(reader.as_ref(), Addr::NULL);
            files.borrow_mut().set_address(reader.as_ref(), Addr::NULL);
            counter.borrow_mut().set_address(reader.as_ref(), Addr::NULL);
            Step::WaitEvent(closed)
        });
    }

    /// StateChanged の購読 2 本
    ///
    /// 先に登録するディレクトリ側が種別キャッシュを更新し、後に登録する
    /// カウンタ側がその種別でゲート判定する。
    fn start_state_changed_tasks(&self) {
        let changed = self.events.state_changed;

        let states = Rc::clone(&self.states);
        let reader = Rc::clone(&self.reader);
        self.sched.start(Step::WaitEvent(changed), move |_| {
            states.borrow_mut().refresh_current_kind(reader.as_ref());
            Step::WaitEvent(changed)
        });

        let states = Rc::clone(&self.states);
        let counter = Rc::clone(&self.area_counter);
        self.sched.start(Step::WaitEvent(changed), move |_| {
            let kind = states.borrow().current_kind();
            if !kind.is_in_game_like() {
                // アドレスが読める状態でも値は信頼できない
                counter.borrow_mut().clear();
            }
            Step::WaitEvent(changed)
        });
    }

    /// AreaChangeDetected でカウンタを同一アドレスのまま再読み取りする
    fn start_area_changed_task(&self) {
        let changed = self.events.area_changed;
        let counter = Rc::clone(&self.area_counter);
        let reader = Rc::clone(&self.reader);
        self.sched.start(Step::WaitEvent(changed), move |_| {
            let mut counter = counter.borrow_mut();
            if !counter.address().is_null() {
                counter.refresh(reader.as_ref(), false);
            }
            Step::WaitEvent(changed)
        });
    }

    /// 変化検出ポーラ 2 本
    ///
    /// 生カウンタとアクティブ状態ポインタを覗き見て、前回値との差分で
    /// ドメインイベントを発火する。読み取り失敗はこの周期では無視する。
    fn start_pollers(&self) {
        let events = self.events;

        let counter = Rc::clone(&self.area_counter);
        let reader = Rc::clone(&self.reader);
        let mut last_counter: Option<i32> = None;
        self.sched.start(Step::WaitDuration(POLL_INTERVAL), move |s| {
            let addr = counter.borrow().address();
            if !addr.is_null() {
                if let Ok(raw) = reader.read_layout::<AreaChangeOffset>(addr) {
                    if last_counter.is_some_and(|prev| prev != raw.counter) {
                        s.raise(events.area_changed);
                    }
                    last_counter = Some(raw.counter);
                }
            }
            Step::WaitDuration(POLL_INTERVAL)
        });

        let states = Rc::clone(&self.states);
        let reader = Rc::clone(&self.reader);
        let mut last_active: Option<Addr> = None;
        self.sched.start(Step::WaitDuration(POLL_INTERVAL), move |s| {
            let active = states.borrow().read_active_ptr(reader.as_ref());
            if let Some(active) = active {
                if last_active.is_some_and(|prev| prev != active) {
                    s.raise(events.state_changed);
                }
                last_active = Some(active);
            }
            Step::WaitDuration(POLL_INTERVAL)
        });
    }
}
