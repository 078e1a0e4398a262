//! Ports - 抽象化レイヤー
//!
//! Dispatcher の外側にいる協調者（worker、task source、model backend、
//! capability）と、テストで差し替える時刻/ID 生成のインターフェース。

pub mod capability;
pub mod clock;
pub mod id_generator;
pub mod model;
pub mod task_source;
pub mod worker;

pub use self::capability::{Capability, CapabilityError};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::model::{BackendError, Message, ModelBackend, Role, truncate_history};
pub use self::task_source::{ShortfallPolicy, SourceContext, SourceError, TaskSource};
pub use self::worker::{FnWorker, TaskContext, Worker, worker_fn};
