//! Concurrent per-document screening fan-out.
//!
//! When screening is delegated to an external judge (typically LLM-backed),
//! each document's call is independent, so a batch fans out concurrently
//! and joins before ranking. Partial failures are collected explicitly: a
//! failed document call aborts its batch with the first error, never
//! silently dropping sibling results, while earlier completed batches stay
//! in the outcome.

use super::Screener;
use crate::config::ScreeningConfig;
use crate::error::{ProviderError, SysrevError};
use crate::screening::engine::{BatchAbort, assemble_batch};
use crate::screening::{
    RelevanceVerdict, ScreeningCriteria, ScreeningOutcome, ScreeningResult,
};
use crate::types::Document;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Judges a single document's relevance. The LLM prompt surface lives
/// behind this trait.
#[async_trait]
pub trait DocumentJudge: Send + Sync {
    async fn judge(
        &self,
        document: &Document,
        criteria: &ScreeningCriteria,
    ) -> Result<RelevanceVerdict, ProviderError>;
}

/// Screener that fans each batch out to a [`DocumentJudge`], one call per
/// document, under a per-call deadline.
pub struct FanOutScreener {
    judge: Arc<dyn DocumentJudge>,
    batch_size: usize,
    per_document_timeout_secs: u64,
}

impl FanOutScreener {
    pub fn new(
        judge: Arc<dyn DocumentJudge>,
        batch_size: usize,
        per_document_timeout_secs: u64,
    ) -> Self {
        Self {
            judge,
            batch_size: batch_size.max(1),
            per_document_timeout_secs,
        }
    }

    /// Build a screener from the screening section of the review config.
    pub fn from_config(judge: Arc<dyn DocumentJudge>, config: &ScreeningConfig) -> Self {
        Self::new(judge, config.batch_size, config.per_document_timeout_secs)
    }

    /// Fan one batch out, join, and split successes from failures.
    async fn screen_batch(
        &self,
        documents: &[Document],
        criteria: &ScreeningCriteria,
    ) -> Result<Vec<ScreeningResult>, ProviderError> {
        let futures = documents.iter().map(|document| {
            let judge = Arc::clone(&self.judge);
            async move {
                let verdict = super::with_deadline(
                    "screener",
                    self.per_document_timeout_secs,
                    judge.judge(document, criteria),
                )
                .await;
                (document, verdict)
            }
        });

        let joined = futures::future::join_all(futures).await;

        let mut results = Vec::with_capacity(joined.len());
        let mut failures: Vec<(String, ProviderError)> = Vec::new();
        for (document, verdict) in joined {
            match verdict {
                Ok(verdict) => results.push(ScreeningResult {
                    document_id: document.id.clone(),
                    title: document.title.clone(),
                    tier: verdict.tier,
                    relevance_score: verdict.tier.normalized(),
                    methodology: verdict.methodology,
                    inclusion_reasons: verdict.inclusion_reasons,
                    exclusion_reasons: verdict.exclusion_reasons,
                    themes: Vec::new(),
                    priority_rank: 0,
                    detailed_review_flag: matches!(
                        verdict.tier,
                        crate::screening::RelevanceTier::High
                            | crate::screening::RelevanceTier::Medium
                    ),
                    user_reviewed: false,
                }),
                Err(error) => {
                    warn!(document = %document.id, error = %error, "Document screening call failed");
                    failures.push((document.id.clone(), error));
                }
            }
        }

        if !failures.is_empty() {
            let failed = failures.len();
            let (document_id, first_error) = failures.remove(0);
            warn!(
                failed,
                succeeded = results.len(),
                first_failed_document = %document_id,
                "Aborting batch after fan-out failures"
            );
            return Err(first_error);
        }

        Ok(results)
    }
}

#[async_trait]
impl Screener for FanOutScreener {
    async fn screen(
        &self,
        documents: &[Document],
        criteria: &ScreeningCriteria,
    ) -> Result<ScreeningOutcome, SysrevError> {
        if documents.is_empty() {
            return Err(crate::error::ScreeningError::EmptyDocumentSet.into());
        }

        let mut batches = Vec::new();
        for (index, chunk) in documents.chunks(self.batch_size).enumerate() {
            let batch_number = index + 1;
            match self.screen_batch(chunk, criteria).await {
                Ok(results) => {
                    let batch =
                        assemble_batch(batch_number, chunk, results, criteria.min_relevance_tier);
                    info!(
                        batch = batch_number,
                        documents = batch.results.len(),
                        "Completed fan-out screening batch"
                    );
                    batches.push(batch);
                }
                Err(error) => {
                    return Ok(ScreeningOutcome {
                        batches,
                        aborted: Some(BatchAbort { batch_number, error: error.into() }),
                    });
                }
            }
        }

        Ok(ScreeningOutcome { batches, aborted: None })
    }
}
