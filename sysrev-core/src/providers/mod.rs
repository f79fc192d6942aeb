//! Capability interfaces for external collaborators, plus the retry and
//! deadline combinators every collaborator call goes through.
//!
//! The concrete transports (paper index API, LLM surface, remote document
//! store) live outside this crate; the core only consumes these traits.

pub mod fanout;
pub mod heuristic;
pub mod mock;
pub mod search;

use crate::config::RetryConfig;
use crate::error::ProviderError;
use crate::screening::{ScreeningCriteria, ScreeningOutcome};
use crate::types::{Document, ResearchQuestion, SearchStrategy};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

pub use fanout::{DocumentJudge, FanOutScreener};
pub use heuristic::{HeuristicAnalyzer, HeuristicFormulator, HeuristicScreener};
pub use mock::{MockAnalyzer, MockFormulator, MockSearchProvider, MockSink};
pub use search::{SearchExecutor, SearchPage, SearchRequest};

/// Turns a free-form research idea into a structured research question.
#[async_trait]
pub trait QuestionFormulator: Send + Sync {
    async fn formulate(
        &self,
        research_idea: &str,
        constraints: &HashMap<String, serde_json::Value>,
    ) -> Result<ResearchQuestion, ProviderError>;
}

/// Derives a keyword search strategy from a research question.
#[async_trait]
pub trait KeywordAnalyzer: Send + Sync {
    async fn analyze(&self, question: &ResearchQuestion) -> Result<SearchStrategy, ProviderError>;
}

/// Paginated access to an external paper index.
///
/// `offset` lets the executor resume a partially fetched result set.
#[async_trait]
pub trait DocumentSearchProvider: Send + Sync {
    async fn search(
        &self,
        request: &SearchRequest,
        offset: usize,
    ) -> Result<SearchPage, ProviderError>;
}

/// Screens a document set against criteria and ranks the results.
///
/// Implementations may be fully local ([`HeuristicScreener`]) or delegate
/// per-document judgement to an LLM ([`FanOutScreener`]).
#[async_trait]
pub trait Screener: Send + Sync {
    async fn screen(
        &self,
        documents: &[Document],
        criteria: &ScreeningCriteria,
    ) -> Result<ScreeningOutcome, crate::error::SysrevError>;
}

/// Audit-trail sink. Failures here must never abort the workflow; the
/// audit recorder logs and continues.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Record a document into a collection; returns the assigned id.
    async fn record(
        &self,
        collection: &str,
        record: serde_json::Value,
        id: Option<&str>,
    ) -> Result<String, ProviderError>;
}

/// Execute an async operation with exponential backoff on retryable errors.
///
/// Retries `Timeout` and `Transient` failures up to `config.max_retries`
/// times; permanent failures return immediately.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !e.is_retryable() || attempt == config.max_retries {
                    return Err(e);
                }
                let backoff_ms = compute_backoff(config, attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Retrying after transient provider error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
        }
    }
}

/// Run a collaborator call under a deadline.
///
/// A blown deadline surfaces as `ProviderError::Timeout` for `stage`, kept
/// distinct from other failures so callers may choose to retry it.
pub async fn with_deadline<T, Fut>(
    stage: &'static str,
    timeout_secs: u64,
    future: Fut,
) -> Result<T, ProviderError>
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), future).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout { stage, timeout_secs }),
    }
}

/// Exponential backoff with optional jitter, capped at `max_backoff_ms`.
fn compute_backoff(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_backoff_ms as f64) as u64;
    if config.jitter {
        // Up to 25% jitter from the subsecond clock; avoids pulling in rand.
        let jitter = (capped as f64 * 0.25 * subsec_fraction()) as u64;
        capped + jitter
    } else {
        capped
    }
}

fn subsec_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
