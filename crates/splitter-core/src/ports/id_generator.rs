//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: Clock ベースの ULID 生成

use crate::domain::ids::BatchId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はバッチ ID を生成
///
/// `Send + Sync` を要求（Dispatcher が Arc で保持するため）
pub trait IdGenerator: Send + Sync {
    fn generate_batch_id(&self) -> BatchId;
}

/// UlidGenerator は Clock の時刻 + ランダム部分で ULID を作る
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_batch_id(&self) -> BatchId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        BatchId::from(ulid)
    }
}
