//! App - dispatcher とその周辺
//!
//! # 主要コンポーネント
//! - **Dispatcher**: fan-out/fan-in でバッチを実行
//! - **ResultCollector**: index ごとの slot に結果を集める
//! - **DispatchConfig**: 同時実行数とタイムアウト
//! - **CapabilitySet**: worker に渡す不変のツール集合
//! - **DispatchEvent**: 進捗イベント（任意）

pub mod capabilities;
pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod events;

pub use self::capabilities::{CapabilitySet, CapabilitySetBuilder};
pub use self::collector::ResultCollector;
pub use self::config::{ConfigError, DEFAULT_CONCURRENCY, DispatchConfig};
pub use self::dispatcher::{BatchReport, Dispatcher, dispatch};
pub use self::events::DispatchEvent;
