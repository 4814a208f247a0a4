//! 統合テスト用の疑似外部プロセスイメージ

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use kagami_layout::{Addr, ForeignRead, ReadError};
use kagami_mirror::context::{AREA_CHANGE_KEY, FILE_ROOT_KEY, STATES_KEY};
use kagami_mirror::Context;
use kagami_sched::Scheduler;

// イメージ内の配置
pub const STATES_ROOT: Addr = Addr(0x1000);
pub const GS_OBJECT: Addr = Addr(0x2000);
pub const STATES_MAP: Addr = Addr(0x3000);
pub const COUNTER_ROOT: Addr = Addr(0x4000);
pub const FILES_ROOT: Addr = Addr(0x4800);
pub const AREA_LOADING_STATE: Addr = Addr(0x5000);
pub const IN_GAME_STATE: Addr = Addr(0x6000);
pub const UNRELATED_STATE: Addr = Addr(0x7000);
pub const LOGIN_STATE: Addr = Addr(0x7800);

const NODE_SIZE: u64 = 0x48;
const NODE_IS_NIL: u64 = 0x19;
const NODE_KEY: u64 = 0x20;
const NODE_VALUE: u64 = 0x40;

/// バイト単位で構築、読み取り回数を数える疑似メモリ
pub struct FakeMemory {
    bytes: RefCell<HashMap<u64, u8>>,
    pub reads: Cell<usize>,
}

impl FakeMemory {
    pub fn new() -> Self {
        Self {
            bytes: RefCell::new(HashMap::new()),
            reads: Cell::new(0),
        }
    }

    pub fn put(&self, addr: Addr, data: &[u8]) {
        let mut bytes = self.bytes.borrow_mut();
        for (i, b) in data.iter().enumerate() {
            bytes.insert(addr.0 + i as u64, *b);
        }
    }

    pub fn put_u64(&self, addr: Addr, value: u64) {
        self.put(addr, &value.to_le_bytes());
    }

    pub fn put_i32(&self, addr: Addr, value: i32) {
        self.put(addr, &value.to_le_bytes());
    }

    pub fn put_u8(&self, addr: Addr, value: u8) {
        self.put(addr, &[value]);
    }

    /// 領域をゼロで埋める
    pub fn zero_region(&self, addr: Addr, size: u64) {
        self.put(addr, &vec![0u8; size as usize]);
    }

    /// ヒープ格納の std::wstring を書き込む
    pub fn put_wstring(&self, header: Addr, buffer: Addr, text: &str) {
        let units: Vec<u16> = text.encode_utf16().collect();
        for (i, unit) in units.iter().enumerate() {
            self.put(buffer.offset(i as u64 * 2), &unit.to_le_bytes());
        }
        self.zero_region(header, 0x20);
        self.put_u64(header, buffer.0);
        self.put_u64(header.offset(0x10), units.len() as u64);
        self.put_u64(header.offset(0x18), 0x10);
    }

    /// 状態ディレクトリの std::map を右に伸びる鎖として構築する
    ///
    /// ノードと文字列バッファはマップアドレスの先の領域に置く。
    pub fn put_states_map(&self, map_addr: Addr, entries: &[(&str, Addr)]) {
        let nil = map_addr.offset(0x100);
        self.zero_region(nil, 0x20);
        self.put_u8(nil.offset(NODE_IS_NIL), 1);

        let head = map_addr.offset(0x140);
        self.zero_region(head, 0x20);
        self.put_u8(head.offset(NODE_IS_NIL), 1);

        let nodes = map_addr.offset(0x200);
        let strings = map_addr.offset(0x600);
        for (i, (name, state_addr)) in entries.iter().enumerate() {
            let node = nodes.offset(i as u64 * NODE_SIZE);
            let right = if i + 1 < entries.len() {
                nodes.offset((i as u64 + 1) * NODE_SIZE)
            } else {
                nil
            };
            self.zero_region(node, NODE_SIZE);
            self.put_u64(node, nil.0);
            self.put_u64(node.offset(0x08), nil.0);
            self.put_u64(node.offset(0x10), right.0);
            self.put_wstring(node.offset(NODE_KEY), strings.offset(i as u64 * 0x80), name);
            self.put_u64(node.offset(NODE_VALUE), state_addr.0);
        }

        let root = if entries.is_empty() { nil } else { nodes };
        self.put_u64(head.offset(0x08), root.0);
        self.put_u64(map_addr, head.0);
        self.put_u64(map_addr.offset(0x08), entries.len() as u64);
    }
}

impl ForeignRead for FakeMemory {
    fn read_bytes(&self, addr: Addr, len: usize) -> Result<Vec<u8>, ReadError> {
        self.reads.set(self.reads.get() + 1);
        let bytes = self.bytes.borrow();
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            match bytes.get(&(addr.0 + i as u64)) {
                Some(b) => out.push(*b),
                None => return Err(ReadError::Unmapped(addr.0 + i as u64)),
            }
        }
        Ok(out)
    }
}

/// 構築済みイメージとオーケストレータ一式
pub struct World {
    pub memory: Rc<FakeMemory>,
    pub sched: Rc<Scheduler>,
    pub ctx: Context,
}

/// 既定の状態ディレクトリエントリ
pub fn default_states() -> Vec<(&'static str, Addr)> {
    vec![
        ("AreaLoadingState", AREA_LOADING_STATE),
        ("InGameState", IN_GAME_STATE),
        ("LoginState", LOGIN_STATE),
    ]
}

/// 疑似イメージを組み立ててコンテキストを初期化する
pub fn setup_with_states(entries: &[(&str, Addr)]) -> World {
    let memory = Rc::new(FakeMemory::new());

    // 静的ルート → ゲーム状態オブジェクト → 状態マップ
    memory.zero_region(STATES_ROOT, 0x10);
    memory.put_u64(STATES_ROOT.offset(0x08), GS_OBJECT.0);
    memory.zero_region(GS_OBJECT, 0x60);
    memory.put_u64(GS_OBJECT.offset(0x48), STATES_MAP.0);
    memory.put_u64(GS_OBJECT.offset(0x58), IN_GAME_STATE.0);
    memory.put_states_map(STATES_MAP, entries);

    // 状態オブジェクトの実体
    memory.zero_region(AREA_LOADING_STATE, 0xd0);
    memory.zero_region(IN_GAME_STATE, 0x448);

    // カウンタとファイル表ルート
    memory.put_i32(COUNTER_ROOT, 1);
    memory.zero_region(FILES_ROOT, 0x18);
    memory.put_u64(FILES_ROOT.offset(0x08), 0xf000);
    memory.put_u64(FILES_ROOT.offset(0x10), 42);

    let sched = Rc::new(Scheduler::new());
    let ctx = Context::new(Rc::clone(&sched), memory.clone() as Rc<dyn ForeignRead>);
    ctx.set_static_address(STATES_KEY, STATES_ROOT);
    ctx.set_static_address(FILE_ROOT_KEY, FILES_ROOT);
    ctx.set_static_address(AREA_CHANGE_KEY, COUNTER_ROOT);
    ctx.initialize();

    World { memory, sched, ctx }
}

pub fn setup() -> World {
    setup_with_states(&default_states())
}
