//! ゲーム状態ディレクトリ
//!
//! 対象プロセス内の状態オブジェクト群（名前 → アドレスの順序付きマップ）を
//! 読み取り、既知の状態ミラーへ配布します。ディレクトリ自体のマップは
//! 追加・上書きのみで、対象側から消えた名前も保持し続けます
//! （最後に観測できた値を可用性のために残す、意図された性質）。

use std::collections::HashMap;
use std::str::FromStr;

use kagami_layout::{
    read_std_map, Addr, ForeignRead, ForeignReadExt, ReadError, StdWString,
};
use strum::EnumString;
use tracing::{debug, trace};

use crate::offsets::{
    AreaLoadingStateOffset, GameStateOffset, GameStateStaticOffset, InGameStateOffset,
};
use crate::remote::Remote;

/// 粗いゲーム状態の種別
///
/// 対象プロセス側の状態名と 1 対 1 に対応する。未知の名前は
/// [`GameStateKind::GameNotLoaded`] に落ちる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
pub enum GameStateKind {
    #[strum(serialize = "AreaLoadingState")]
    AreaLoading,
    #[strum(serialize = "WaitingState")]
    Waiting,
    #[strum(serialize = "CreditsState")]
    Credits,
    #[strum(serialize = "EscapeState")]
    Escape,
    #[strum(serialize = "InGameState")]
    InGame,
    #[strum(serialize = "ChangePasswordState")]
    ChangePassword,
    #[strum(serialize = "LoginState")]
    Login,
    #[strum(serialize = "PreGameState")]
    PreGame,
    #[strum(serialize = "CreateCharacterState")]
    CreateCharacter,
    #[strum(serialize = "SelectCharacterState")]
    SelectCharacter,
    #[strum(serialize = "DeleteCharacterState")]
    DeleteCharacter,
    #[default]
    GameNotLoaded,
}

impl GameStateKind {
    /// 対象側の状態名から種別を引く（未知名は GameNotLoaded）
    pub fn from_name(name: &str) -> Self {
        Self::from_str(name).unwrap_or_default()
    }

    /// カウンタ類の値が信頼できる「ゲーム内相当」の状態か
    pub fn is_in_game_like(self) -> bool {
        matches!(
            self,
            GameStateKind::InGame | GameStateKind::Escape | GameStateKind::AreaLoading
        )
    }
}

/// AreaLoadingState オブジェクトのミラー
#[derive(Debug, Default)]
pub struct AreaLoadingState {
    address: Addr,
    is_loading: bool,
}

impl AreaLoadingState {
    /// エリアロード中かどうか（キャッシュ値）
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }
}

impl Remote for AreaLoadingState {
    fn address(&self) -> Addr {
        self.address
    }

    fn store_address(&mut self, addr: Addr) {
        self.address = addr;
    }

    fn refresh(&mut self, reader: &dyn ForeignRead, _address_changed: bool) {
        if self.address.is_null() {
            return;
        }
        match reader.read_layout::<AreaLoadingStateOffset>(self.address) {
            Ok(data) => self.is_loading = data.is_loading != 0,
            Err(e) => debug!(address = %self.address, error = %e, "AreaLoadingState refresh failed"),
        }
    }

    fn clear(&mut self) {
        self.is_loading = false;
    }
}

/// InGameState オブジェクトのミラー
#[derive(Debug, Default)]
pub struct InGameState {
    address: Addr,
    data: InGameStateOffset,
}

impl InGameState {
    /// キャッシュ済みのレイアウトデータ
    pub fn data(&self) -> &InGameStateOffset {
        &self.data
    }
}

impl Remote for InGameState {
    fn address(&self) -> Addr {
        self.address
    }

    fn store_address(&mut self, addr: Addr) {
        self.address = addr;
    }

    fn refresh(&mut self, reader: &dyn ForeignRead, _address_changed: bool) {
        if self.address.is_null() {
            return;
        }
        match reader.read_layout::<InGameStateOffset>(self.address) {
            Ok(data) => self.data = data,
            Err(e) => debug!(address = %self.address, error = %e, "InGameState refresh failed"),
        }
    }

    fn clear(&mut self) {
        self.data = InGameStateOffset::default();
    }
}

/// ゲーム状態ディレクトリ（粗いコントローラ）
///
/// 静的ルートのアドレスを 1 つ持ち、アドレス設定のたびに状態マップを
/// デコードして既知のサブミラーへ配布します。未知の名前は黙って
/// 読み飛ばします（対象側の追加に対する前方互換）。
pub struct GameStates {
    address: Addr,
    /// 名前 → アドレスのディレクトリ。追加・上書きのみで削除しない。
    all_states: HashMap<String, Addr>,
    /// AreaLoadingState のミラー
    pub area_loading: AreaLoadingState,
    /// InGameState のミラー
    pub in_game: InGameState,
    /// ゲーム状態オブジェクトのアドレス（アクティブ状態の読み直しに使う）
    game_state_object: Addr,
    current_kind: GameStateKind,
}

impl Default for GameStates {
    fn default() -> Self {
        Self::new()
    }
}

impl GameStates {
    pub fn new() -> Self {
        Self {
            address: Addr::NULL,
            all_states: HashMap::new(),
            area_loading: AreaLoadingState::default(),
            in_game: InGameState::default(),
            game_state_object: Addr::NULL,
            current_kind: GameStateKind::GameNotLoaded,
        }
    }

    /// これまでに観測した全状態の名前 → アドレス表
    pub fn all_states(&self) -> &HashMap<String, Addr> {
        &self.all_states
    }

    /// 現在の粗いゲーム状態（キャッシュ値）
    pub fn current_kind(&self) -> GameStateKind {
        self.current_kind
    }

    /// 状態マップをデコードして配布する
    fn try_refresh(&mut self, reader: &dyn ForeignRead) -> Result<(), ReadError> {
        let static_obj: GameStateStaticOffset = reader.read_layout(self.address)?;
        let game_state: GameStateOffset = reader.read_layout(static_obj.game_state)?;
        let entries = read_std_map::<StdWString, Addr>(reader, game_state.states)?;

        for (key, state_addr) in entries {
            let name = key.read(reader)?;
            trace!(state = %name, address = %state_addr, "observed game state");
            self.dispatch_known(reader, &name, state_addr);
            // 追加・上書きのみ。消えた名前は残す。
            self.all_states.insert(name, state_addr);
        }

        self.game_state_object = static_obj.game_state;
        self.refresh_current_kind(reader);
        Ok(())
    }

    /// 既知のサブミラーへ名前の完全一致で配布する。未知名は無視。
    fn dispatch_known(&mut self, reader: &dyn ForeignRead, name: &str, addr: Addr) {
        match name {
            "AreaLoadingState" => self.area_loading.set_address(reader, addr),
            "InGameState" => self.in_game.set_address(reader, addr),
            _ => {}
        }
    }

    /// アクティブ状態のポインタを読み直し、粗い種別を解決し直す
    ///
    /// 読み取りに失敗した場合やディレクトリに載っていないアドレスの
    /// 場合は直前の種別を保持します。
    pub fn refresh_current_kind(&mut self, reader: &dyn ForeignRead) {
        let Some(active) = self.read_active_ptr(reader) else {
            return;
        };
        let resolved = self
            .all_states
            .iter()
            .find(|(_, addr)| **addr == active)
            .map(|(name, _)| GameStateKind::from_name(name));
        if let Some(kind) = resolved {
            self.current_kind = kind;
        }
    }

    /// アクティブ状態オブジェクトのポインタを読む（変化検出用）
    pub fn read_active_ptr(&self, reader: &dyn ForeignRead) -> Option<Addr> {
        if self.game_state_object.is_null() {
            return None;
        }
        match reader.read_layout::<GameStateOffset>(self.game_state_object) {
            Ok(game_state) => Some(game_state.current_state),
            Err(e) => {
                debug!(error = %e, "active state pointer read failed");
                None
            }
        }
    }
}

impl Remote for GameStates {
    fn address(&self) -> Addr {
        self.address
    }

    fn store_address(&mut self, addr: Addr) {
        self.address = addr;
    }

    fn refresh(&mut self, reader: &dyn ForeignRead, _address_changed: bool) {
        if self.address.is_null() {
            return;
        }
        if let Err(e) = self.try_refresh(reader) {
            debug!(address = %self.address, error = %e, "GameStates refresh failed");
        }
    }

    /// 既知サブミラーとアクティブ状態の種別を番兵へ戻す
    ///
    /// ディレクトリ本体は意図して消さない。
    fn clear(&mut self) {
        self.area_loading.store_address(Addr::NULL);
        self.area_loading.clear();
        self.in_game.store_address(Addr::NULL);
        self.in_game.clear();
        self.game_state_object = Addr::NULL;
        self.current_kind = GameStateKind::GameNotLoaded;
    }
}
