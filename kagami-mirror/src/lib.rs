//! Kagami ミラーフレームワークのコア機能
//!
//! このクレートは、観測対象プロセス内の状態を型付きでローカルに
//! 写し取る（ミラーする）ためのフレームワークを提供します。
//! アドレス追跡エンティティの更新プロトコル、状態ディレクトリ、
//! エリア変更カウンタ、そしてそれらを協調スケジューラに束ねる
//! オーケストレータを含みます。

pub mod context;
pub mod counter;
pub mod events;
pub mod files;
pub mod offsets;
pub mod remote;
pub mod states;

pub use context::Context;
pub use counter::AreaChangeCounter;
pub use events::MirrorEvents;
pub use files::FilesRoot;
pub use remote::Remote;
pub use states::{GameStateKind, GameStates};

/// ミラーフレームワークの結果型
pub type Result<T> = anyhow::Result<T>;
