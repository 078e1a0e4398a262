//! Capability port - a named tool a worker may call

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability not found: {0}")]
    NotFound(String),

    #[error("duplicate capability: {0}")]
    Duplicate(String),

    #[error("invalid input for {name}: {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// A tool exposed to workers through `CapabilitySet`.
///
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &'static str;

    async fn invoke(&self, input: serde_json::Value) -> Result<serde_json::Value, CapabilityError>;
}
