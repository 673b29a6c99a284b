//! `~/.foreman/config.yaml`: every field optional, defaults baked in.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RegistryError};
use crate::registry::{foreman_dir_at, home};

/// Default backlog location, relative to each project directory.
pub const DEFAULT_BACKLOG_FILE: &str = ".claude/tasks/tasks.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backlog_file: PathBuf,
    pub dispatch: DispatchConfig,
    pub worker: WorkerConfig,
    pub local: LocalTierConfig,
    pub batch: BatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backlog_file: PathBuf::from(DEFAULT_BACKLOG_FILE),
            dispatch: DispatchConfig::default(),
            worker: WorkerConfig::default(),
            local: LocalTierConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

/// Size budget for one dispatch request, in estimated tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub budget_tokens: usize,
    pub overhead_tokens: usize,
    pub chars_per_token: usize,
    /// Upper bound on the share of `budget_tokens` spent on pre-loaded files.
    pub max_file_share: f64,
    /// Below this many remaining tokens a file is skipped instead of truncated.
    pub min_truncated_tokens: usize,
    pub max_turns: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            budget_tokens: 60_000,
            overhead_tokens: 5_000,
            chars_per_token: 4,
            max_file_share: 0.5,
            min_truncated_tokens: 256,
            max_turns: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            args: vec!["-p".to_string()],
        }
    }
}

/// Settings for [`crate::types::Tier::Local`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalTierConfig {
    pub model: String,
    /// Environment variable the worker reads its inference endpoint from.
    pub endpoint_var: String,
}

impl Default for LocalTierConfig {
    fn default() -> Self {
        Self {
            model: "qwen2.5-coder".to_string(),
            endpoint_var: "ANTHROPIC_BASE_URL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub size: usize,
    pub dry_run_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: 3,
            dry_run_delay_ms: 500,
        }
    }
}

/// `<home>/.foreman/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    foreman_dir_at(home).join("config.yaml")
}

impl Config {
    /// Load from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        // An empty file is valid YAML `null`; treat it as "all defaults".
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_at(home: &Path) -> Result<Self, ConfigError> {
        Self::load_from(&config_path_at(home))
    }

    pub fn load() -> Result<Self, ConfigError> {
        let home = home().map_err(|e: RegistryError| ConfigError::Invalid {
            field: "home",
            message: e.to_string(),
        })?;
        Self::load_at(&home)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.chars_per_token == 0 {
            return Err(ConfigError::Invalid {
                field: "dispatch.chars_per_token",
                message: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.dispatch.max_file_share) {
            return Err(ConfigError::Invalid {
                field: "dispatch.max_file_share",
                message: format!("{} is outside 0.0..=1.0", self.dispatch.max_file_share),
            });
        }
        if self.worker.program.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "worker.program",
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }
}
