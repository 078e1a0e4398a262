//! `code_stats` capability: rough structural counts for a source text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ports::{Capability, CapabilityError};

/// Only the first `MAX_SOURCE_BYTES` of the input are analysed.
pub const MAX_SOURCE_BYTES: usize = 10_000;

#[derive(Debug, Deserialize)]
struct Input {
    source: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub lines: usize,
    pub blank: usize,
    pub functions: usize,
    pub types: usize,
    pub imports: usize,
}

const FUNCTION_PREFIXES: &[&str] = &["fn ", "pub fn ", "async fn ", "pub async fn ", "def "];
const TYPE_PREFIXES: &[&str] = &["struct ", "pub struct ", "enum ", "pub enum ", "class "];
const IMPORT_PREFIXES: &[&str] = &["use ", "pub use ", "import ", "from "];

fn starts_with_any(line: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| line.starts_with(p))
}

pub fn analyze(source: &str) -> Stats {
    let mut end = source.len().min(MAX_SOURCE_BYTES);
    while !source.is_char_boundary(end) {
        end -= 1;
    }

    source[..end].lines().fold(Stats::default(), |mut stats, line| {
        let line = line.trim_start();
        stats.lines += 1;
        if line.is_empty() {
            stats.blank += 1;
        } else if starts_with_any(line, FUNCTION_PREFIXES) {
            stats.functions += 1;
        } else if starts_with_any(line, TYPE_PREFIXES) {
            stats.types += 1;
        } else if starts_with_any(line, IMPORT_PREFIXES) {
            stats.imports += 1;
        }
        stats
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CodeStats;

#[async_trait]
impl Capability for CodeStats {
    fn name(&self) -> &'static str {
        "code_stats"
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<serde_json::Value, CapabilityError> {
        let input: Input =
            serde_json::from_value(input).map_err(|e| CapabilityError::InvalidInput {
                name: self.name().to_string(),
                reason: e.to_string(),
            })?;
        serde_json::to_value(analyze(&input.source))
            .map_err(|e| CapabilityError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = "use std::fmt;\n\npub struct A;\n\nfn main() {\n    helper();\n}\n\n    async fn helper() {}\n";

    #[test]
    fn counts_structure() {
        assert_eq!(
            analyze(SAMPLE),
            Stats {
                lines: 9,
                blank: 3,
                functions: 2,
                types: 1,
                imports: 1,
            }
        );
    }

    #[test]
    fn input_is_capped() {
        let big = "x\n".repeat(MAX_SOURCE_BYTES);
        assert_eq!(analyze(&big).lines, MAX_SOURCE_BYTES / 2);
    }

    #[tokio::test]
    async fn capability_reports_json() {
        let out = CodeStats.invoke(json!({ "source": "def f():\n    pass\n" })).await.unwrap();
        assert_eq!(out["functions"], 1);
        assert_eq!(out["lines"], 2);
    }

    #[tokio::test]
    async fn missing_source_is_invalid_input() {
        let err = CodeStats.invoke(json!({ "path": "x.rs" })).await.unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidInput { .. }));
    }
}
