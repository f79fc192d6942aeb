//! Configuration system for the review pipeline.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment. Configuration lives in
//! `~/.config/sysrev/config.toml` and/or `.sysrev/config.toml` in the
//! workspace directory; `SYSREV_*` environment variables override both.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for a review run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewConfig {
    pub workflow: WorkflowConfig,
    pub search: SearchConfig,
    pub screening: ScreeningConfig,
    pub retry: RetryConfig,
}

/// Configuration for the workflow state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Deadline applied to every external collaborator call, in seconds.
    pub stage_timeout_secs: u64,
    /// Directory for persisted run history (`None` disables persistence).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<std::path::PathBuf>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 120,
            state_dir: None,
        }
    }
}

/// Configuration for document search execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of documents to fetch per run.
    pub max_results: usize,
    /// Page size requested from the provider.
    pub page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 50,
            page_size: 10,
        }
    }
}

/// Configuration for the screening engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningConfig {
    /// Documents per screening batch.
    pub batch_size: usize,
    /// Deadline per document for LLM-backed screening calls, in seconds.
    pub per_document_timeout_secs: u64,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            per_document_timeout_secs: 30,
        }
    }
}

/// Exponential backoff settings for transient provider failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// First backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Multiplier applied per attempt.
    pub backoff_multiplier: f64,
    /// Upper bound on any single backoff delay.
    pub max_backoff_ms: u64,
    /// Whether to add up to 25% jitter.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            backoff_multiplier: 2.0,
            max_backoff_ms: 10_000,
            jitter: true,
        }
    }
}

/// Load layered configuration.
///
/// Later layers win: defaults, then the user config file, then the
/// workspace file, then an explicitly passed file, then `SYSREV_*`
/// environment variables (nested keys separated by `__`, e.g.
/// `SYSREV_SEARCH__MAX_RESULTS`).
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<ReviewConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ReviewConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "sysrev", "sysrev") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".sysrev").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::FileNotFound { path: path.to_path_buf() });
        }
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("SYSREV_").split("__"));

    let config: ReviewConfig = figment
        .extract()
        .map_err(|e| ConfigError::ParseError { message: e.to_string() })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ReviewConfig) -> Result<(), ConfigError> {
    if config.screening.batch_size == 0 {
        return Err(ConfigError::Invalid { message: "screening.batch_size must be at least 1".into() });
    }
    if config.search.page_size == 0 || config.search.max_results == 0 {
        return Err(ConfigError::Invalid {
            message: "search.page_size and search.max_results must be at least 1".into(),
        });
    }
    if config.workflow.stage_timeout_secs == 0 {
        return Err(ConfigError::Invalid { message: "workflow.stage_timeout_secs must be at least 1".into() });
    }
    Ok(())
}
