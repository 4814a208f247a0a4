//! 観測対象プログラムのオフセット表
//!
//! レイアウトは純データであり、対象プログラムのバージョン更新では
//! このモジュールだけを差し替えます。オフセットは無条件に信頼される
//! ため、版ずれはデコードエラーではなく無意味な値として現れます。

use kagami_layout::{remote_layout, Addr};

remote_layout! {
    /// ゲーム状態の静的ルート
    pub struct GameStateStaticOffset: 0x10 {
        0x08 => game_state: Addr,
    }
}

remote_layout! {
    /// ゲーム状態オブジェクト
    ///
    /// `states` は std::map<std::wstring, Addr>、`current_state` は
    /// アクティブな状態オブジェクトを指す。
    pub struct GameStateOffset: 0x60 {
        0x48 => states: Addr,
        0x58 => current_state: Addr,
    }
}

remote_layout! {
    /// エリア変更カウンタ
    pub struct AreaChangeOffset: 0x04 {
        0x00 => counter: i32,
    }
}

remote_layout! {
    /// ロード済みファイル表のルート
    pub struct FileRootOffset: 0x18 {
        0x08 => root: Addr,
        0x10 => count: u64,
    }
}

remote_layout! {
    /// AreaLoadingState オブジェクト
    pub struct AreaLoadingStateOffset: 0xd0 {
        0xc8 => is_loading: u32,
    }
}

remote_layout! {
    /// InGameState オブジェクト
    pub struct InGameStateOffset: 0x448 {
        0x018 => area_instance: Addr,
        0x078 => world_data: Addr,
        0x1a8 => ui_root: Addr,
        0x440 => in_game_ui: Addr,
    }
}
