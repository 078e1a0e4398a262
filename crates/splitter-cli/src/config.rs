//! splitter.toml
//!
//! ```toml
//! system_prompt = "You are a sub-agent."
//! results_path = "results.json"
//! todo_path = ".todos.json"
//! projects = ["core", "cli"]
//!
//! [dispatch]
//! concurrency = 4
//! task_timeout_ms = 30000
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use splitter_core::DispatchConfig;

pub const DEFAULT_CONFIG_PATH: &str = "splitter.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub dispatch: DispatchConfig,
    pub system_prompt: Option<String>,
    pub results_path: PathBuf,
    pub todo_path: PathBuf,
    /// 空なら project 名のチェックをしない
    pub projects: Vec<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            system_prompt: None,
            results_path: PathBuf::from("results.json"),
            todo_path: PathBuf::from(".todos.json"),
            projects: Vec::new(),
        }
    }
}

impl CliConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: CliConfig = toml::from_str(s).context("parse splitter config")?;
        config.dispatch.validate()?;
        Ok(config)
    }

    /// 明示されたパスは必須。省略時は `splitter.toml` があれば読む。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("load config {}", path.display()))
    }

    pub fn override_concurrency(&mut self, concurrency: Option<usize>) -> Result<()> {
        if let Some(c) = concurrency {
            self.dispatch.concurrency = c;
            self.dispatch.validate()?;
        }
        Ok(())
    }
}
