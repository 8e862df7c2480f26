//! Settings file. Every field is optional; command-line flags override it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::models::session::SearchSettings;

pub const DEFAULT_ENGINE_CMD: &str = "stockfish";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub engine: EngineConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Defaults to a quarter of the available cores
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_ENGINE_CMD.to_string(),
            args: Vec::new(),
            threads: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub depth: u32,
    pub lines: u32,
    pub infinite: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            depth: 20,
            lines: 1,
            infinite: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.analysis.depth >= 1, "depth must be at least 1");
        ensure!(self.analysis.lines >= 1, "lines must be at least 1");
        ensure!(self.engine.threads != Some(0), "threads must be at least 1");
        ensure!(!self.engine.command.trim().is_empty(), "engine command is empty");
        Ok(())
    }

    pub fn threads(&self) -> u32 {
        self.engine.threads.unwrap_or_else(default_threads)
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            depth: self.analysis.depth,
            lines: self.analysis.lines,
            threads: self.threads(),
            infinite: self.analysis.infinite,
        }
    }
}

/// A quarter of the machine, at least one thread.
pub fn default_threads() -> u32 {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1);
    (cores / 4).max(1)
}
