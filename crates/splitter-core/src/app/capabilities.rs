//! CapabilitySet - worker が使えるツールの不変な集合
//!
//! 起動時に builder で登録し、`build()` 以降は読み取り専用で全タスクが共有する。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ports::{Capability, CapabilityError};

/// Builder for a `CapabilitySet`.
///
/// Design:
/// - Built during initialization (mutable).
/// - Frozen into `CapabilitySet` and shared read-only by every task.
///   No locks, and no task can register or replace a tool mid-batch.
#[derive(Default)]
pub struct CapabilitySetBuilder {
    capabilities: HashMap<&'static str, Arc<dyn Capability>>,
}

impl CapabilitySetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, capability: Arc<dyn Capability>) -> Result<Self, CapabilityError> {
        let name = capability.name();
        if self.capabilities.contains_key(name) {
            return Err(CapabilityError::Duplicate(name.to_string()));
        }
        self.capabilities.insert(name, capability);
        Ok(self)
    }

    pub fn build(self) -> CapabilitySet {
        CapabilitySet {
            capabilities: self.capabilities,
        }
    }
}

/// Immutable set of tools handed to every worker through its `TaskContext`.
#[derive(Default)]
pub struct CapabilitySet {
    capabilities: HashMap<&'static str, Arc<dyn Capability>>,
}

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> CapabilitySetBuilder {
        CapabilitySetBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.get(name)
    }

    pub async fn invoke(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CapabilityError> {
        let capability = self
            .get(name)
            .ok_or_else(|| CapabilityError::NotFound(name.to_string()))?;
        capability.invoke(input).await
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.capabilities.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Upper;

    #[async_trait]
    impl Capability for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        async fn invoke(
            &self,
            input: serde_json::Value,
        ) -> Result<serde_json::Value, CapabilityError> {
            let s = input.as_str().ok_or_else(|| CapabilityError::InvalidInput {
                name: "upper".into(),
                reason: "expected a string".into(),
            })?;
            Ok(serde_json::Value::String(s.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn registered_capability_can_be_invoked() {
        let set = CapabilitySet::builder()
            .register(Arc::new(Upper))
            .unwrap()
            .build();

        let out = set.invoke("upper", serde_json::json!("abc")).await.unwrap();
        assert_eq!(out, serde_json::json!("ABC"));
        assert_eq!(set.names(), vec!["upper"]);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let result = CapabilitySet::builder()
            .register(Arc::new(Upper))
            .unwrap()
            .register(Arc::new(Upper));
        assert!(matches!(result, Err(CapabilityError::Duplicate(name)) if name == "upper"));
    }

    #[tokio::test]
    async fn missing_capability_is_an_error() {
        let set = CapabilitySet::empty();
        let err = set.invoke("nope", serde_json::Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(set.is_empty());
    }
}
