//! Error types for the Sysrev review core.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the workflow, screening, search, collaborator, and
//! configuration domains. Retry behaviour keys off the variant, never off
//! string matching: timeouts and transient provider failures are the only
//! retryable kinds.

use crate::workflow::ReviewStep;

/// Top-level error type for the Sysrev core library.
#[derive(Debug, thiserror::Error)]
pub enum SysrevError {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Screening error: {0}")]
    Screening(#[from] ScreeningError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the workflow state machine.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Operation '{operation}' is not valid at step {step}")]
    IllegalState {
        operation: &'static str,
        step: ReviewStep,
    },

    #[error("Operation '{operation}' requires a started workflow")]
    NotStarted { operation: &'static str },

    #[error("Workflow is in the error state ({message}); rewind or restart first")]
    Errored { message: String },

    #[error("Edit does not apply to the current {step} payload: {reason}")]
    InvalidEdit { step: ReviewStep, reason: String },
}

/// Errors from the screening engine.
#[derive(Debug, thiserror::Error)]
pub enum ScreeningError {
    #[error("Document '{document_id}' is missing required field '{field}'")]
    MissingField {
        document_id: String,
        field: &'static str,
    },

    #[error("Cannot screen an empty document set")]
    EmptyDocumentSet,

    #[error("Batch size must be at least 1")]
    InvalidBatchSize,

    #[error("No screening batch completed; first failure: {message}")]
    NoBatchCompleted { message: String },
}

/// Errors from search request validation and execution.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search query cannot be empty")]
    EmptyQuery,

    #[error("Invalid category '{category}'; valid categories are: {valid}")]
    InvalidCategory { category: String, valid: String },

    #[error("max_results must be at least 1")]
    InvalidMaxResults,
}

/// Errors from external collaborator calls (formulator, analyzer, search
/// provider, LLM screener).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Call to {stage} timed out after {timeout_secs}s")]
    Timeout { stage: &'static str, timeout_secs: u64 },

    #[error("Transient failure from {stage}: {message}")]
    Transient { stage: &'static str, message: String },

    #[error("Call to {stage} failed: {message}")]
    Failed { stage: &'static str, message: String },
}

impl ProviderError {
    /// Whether the error is worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout { .. } | ProviderError::Transient { .. }
        )
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: std::path::PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `SysrevError`.
pub type Result<T> = std::result::Result<T, SysrevError>;
