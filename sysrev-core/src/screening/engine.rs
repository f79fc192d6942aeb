//! The screening engine: batches documents, scores and ranks them, and
//! aggregates per-batch themes and statistics.
//!
//! Each batch is processed independently. Themes and priority ranks never
//! cross batch boundaries: relevance ranking is only meaningful relative to
//! the documents screened together.

use super::criteria::{
    BatchStatistics, RelevanceTier, ScreeningBatch, ScreeningCriteria, ScreeningResult,
};
use super::relevance;
use super::themes;
use crate::error::{ScreeningError, SysrevError};
use crate::types::Document;
use chrono::Utc;
use tracing::{info, warn};

/// Record of a batch that failed mid-screening.
#[derive(Debug)]
pub struct BatchAbort {
    /// 1-based number of the aborted batch.
    pub batch_number: usize,
    /// The error that aborted it.
    pub error: SysrevError,
}

/// Outcome of a screening run: completed batches plus an optional abort.
///
/// A malformed document aborts its whole batch fail-fast, but batches that
/// completed before it are preserved here. Callers choose whether an abort
/// is fatal.
#[derive(Debug)]
pub struct ScreeningOutcome {
    pub batches: Vec<ScreeningBatch>,
    pub aborted: Option<BatchAbort>,
}

impl ScreeningOutcome {
    /// Total documents across all completed batches.
    pub fn total_processed(&self) -> usize {
        self.batches.iter().map(|b| b.results.len()).sum()
    }

    /// Flatten completed batches into a single result list, batch order
    /// preserved.
    pub fn into_results(self) -> Vec<ScreeningResult> {
        self.batches.into_iter().flat_map(|b| b.results).collect()
    }
}

/// Screens documents in fixed-size batches using the local heuristics.
pub struct ScreeningEngine {
    batch_size: usize,
}

impl ScreeningEngine {
    /// Create an engine with the given batch size.
    pub fn new(batch_size: usize) -> Result<Self, ScreeningError> {
        if batch_size == 0 {
            return Err(ScreeningError::InvalidBatchSize);
        }
        Ok(Self { batch_size })
    }

    /// Screen a document set in consecutive batches (the last batch may be
    /// shorter).
    ///
    /// Returns `Err` only for invalid input; per-batch failures are
    /// reported through [`ScreeningOutcome::aborted`] with earlier batches
    /// intact.
    pub fn screen(
        &self,
        documents: &[Document],
        criteria: &ScreeningCriteria,
    ) -> Result<ScreeningOutcome, ScreeningError> {
        if documents.is_empty() {
            return Err(ScreeningError::EmptyDocumentSet);
        }

        let mut batches = Vec::new();
        for (index, chunk) in documents.chunks(self.batch_size).enumerate() {
            let batch_number = index + 1;
            match screen_one_batch(batch_number, chunk, criteria) {
                Ok(batch) => {
                    info!(
                        batch = batch_number,
                        documents = batch.results.len(),
                        high = batch.statistics.high,
                        medium = batch.statistics.medium,
                        "Completed screening batch"
                    );
                    batches.push(batch);
                }
                Err(error) => {
                    warn!(batch = batch_number, error = %error, "Screening batch aborted");
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

/// Score, rank, and theme a single batch. Fail-fast: the first malformed
/// document aborts the batch.
pub(crate) fn screen_one_batch(
    batch_number: usize,
    documents: &[Document],
    criteria: &ScreeningCriteria,
) -> Result<ScreeningBatch, ScreeningError> {
    let mut results = Vec::with_capacity(documents.len());
    for document in documents {
        let verdict = relevance::score(document, criteria)?;
        results.push(ScreeningResult {
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
                RelevanceTier::High | RelevanceTier::Medium
            ),
            user_reviewed: false,
        });
    }

    Ok(assemble_batch(batch_number, documents, results, criteria.min_relevance_tier))
}

/// Rank scored results, attach batch themes, and compute statistics.
///
/// Shared by the local engine and the concurrent fan-out screener: ranking
/// and theme attachment are identical regardless of how the per-document
/// verdicts were produced. Results below `min_tier` get an explicit
/// exclusion reason.
pub(crate) fn assemble_batch(
    batch_number: usize,
    documents: &[Document],
    mut results: Vec<ScreeningResult>,
    min_tier: RelevanceTier,
) -> ScreeningBatch {
    let batch_themes = themes::extract(documents);

    for result in &mut results {
        if result.tier < min_tier {
            result
                .exclusion_reasons
                .push(format!("below minimum relevance tier '{min_tier}'"));
        }
    }

    // Stable sort: ties keep submission order.
    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (index, result) in results.iter_mut().enumerate() {
        result.priority_rank = index + 1;
        result.themes = batch_themes
            .iter()
            .filter(|t| t.document_ids.contains(&result.document_id))
            .map(|t| t.name.clone())
            .collect();
    }

    let statistics = BatchStatistics::tally(&results);
    ScreeningBatch {
        batch_number,
        results,
        themes: batch_themes,
        statistics,
        screened_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::criteria::Methodology;
    use std::collections::BTreeSet;

    fn doc(id: &str, title: &str, abstract_text: &str) -> Document {
        Document::new(id, title, abstract_text)
    }

    fn quantum_criteria() -> ScreeningCriteria {
        ScreeningCriteria {
            required_keywords: vec!["quantum".into()],
            methodology_types: [Methodology::Experimental].into_iter().collect::<BTreeSet<_>>(),
            ..ScreeningCriteria::default()
        }
    }

    fn ten_docs() -> Vec<Document> {
        (0..10)
            .map(|i| {
                doc(
                    &format!("d{i}"),
                    &format!("Quantum paper {i}"),
                    "A quantum experiment with careful measurement.",
                )
            })
            .collect()
    }

    #[test]
    fn test_batch_partitioning() {
        // 10 documents, batch_size 4 → batches of [4, 4, 2].
        let engine = ScreeningEngine::new(4).unwrap();
        let outcome = engine.screen(&ten_docs(), &quantum_criteria()).unwrap();
        assert_eq!(outcome.batches.len(), 3);
        let sizes: Vec<usize> = outcome.batches.iter().map(|b| b.results.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(outcome.total_processed(), 10);
    }

    #[test]
    fn test_priority_ranks_dense_within_batch() {
        let engine = ScreeningEngine::new(4).unwrap();
        let outcome = engine.screen(&ten_docs(), &quantum_criteria()).unwrap();
        for batch in &outcome.batches {
            let mut ranks: Vec<usize> =
                batch.results.iter().map(|r| r.priority_rank).collect();
            ranks.sort_unstable();
            let expected: Vec<usize> = (1..=batch.results.len()).collect();
            assert_eq!(ranks, expected);
        }
    }

    #[test]
    fn test_stable_sort_preserves_submission_order_on_ties() {
        // All documents score identically; ranks must follow input order.
        let engine = ScreeningEngine::new(5).unwrap();
        let outcome = engine.screen(&ten_docs()[..5], &quantum_criteria()).unwrap();
        let ids: Vec<&str> = outcome.batches[0]
            .results
            .iter()
            .map(|r| r.document_id.as_str())
            .collect();
        assert_eq!(ids, vec!["d0", "d1", "d2", "d3", "d4"]);
    }

    #[test]
    fn test_ranking_puts_higher_tier_first() {
        let docs = vec![
            doc("low", "Unrelated title", "Unrelated content entirely."),
            doc("high", "Quantum work", "A quantum experiment with measurement."),
        ];
        let engine = ScreeningEngine::new(10).unwrap();
        let outcome = engine.screen(&docs, &quantum_criteria()).unwrap();
        let batch = &outcome.batches[0];
        assert_eq!(batch.results[0].document_id, "high");
        assert_eq!(batch.results[0].priority_rank, 1);
        assert_eq!(batch.results[1].document_id, "low");
        assert_eq!(batch.results[1].priority_rank, 2);
    }

    #[test]
    fn test_malformed_document_aborts_batch_keeps_earlier() {
        let mut docs = ten_docs();
        docs[5].abstract_text.clear(); // second batch contains the bad doc
        let engine = ScreeningEngine::new(4).unwrap();
        let outcome = engine.screen(&docs, &quantum_criteria()).unwrap();
        assert_eq!(outcome.batches.len(), 1); // only batch 1 completed
        let abort = outcome.aborted.expect("batch 2 should abort");
        assert_eq!(abort.batch_number, 2);
        assert!(matches!(
            abort.error,
            SysrevError::Screening(ScreeningError::MissingField { field: "abstract", .. })
        ));
    }

    #[test]
    fn test_empty_document_set_rejected() {
        let engine = ScreeningEngine::new(4).unwrap();
        assert!(matches!(
            engine.screen(&[], &ScreeningCriteria::default()),
            Err(ScreeningError::EmptyDocumentSet)
        ));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            ScreeningEngine::new(0),
            Err(ScreeningError::InvalidBatchSize)
        ));
    }

    #[test]
    fn test_themes_attached_to_participating_results() {
        let docs = vec![
            doc("a", "Quantum entanglement studies", "Shared entanglement vocabulary."),
            doc("b", "More entanglement", "Also about entanglement."),
            doc("c", "Different topic", "Nothing in common."),
        ];
        let engine = ScreeningEngine::new(10).unwrap();
        let outcome = engine.screen(&docs, &ScreeningCriteria::default()).unwrap();
        let batch = &outcome.batches[0];
        let find = |id: &str| batch.results.iter().find(|r| r.document_id == id).unwrap();
        assert!(find("a").themes.contains(&"entanglement".to_string()));
        assert!(find("b").themes.contains(&"entanglement".to_string()));
        assert!(find("c").themes.is_empty());
    }

    #[test]
    fn test_min_tier_floor_adds_exclusion_reason() {
        let docs = vec![
            doc("hit", "Quantum work", "A quantum experiment with measurement."),
            doc("miss", "Unrelated", "Nothing matching at all."),
        ];
        let criteria = ScreeningCriteria {
            min_relevance_tier: RelevanceTier::Medium,
            ..quantum_criteria()
        };
        let engine = ScreeningEngine::new(10).unwrap();
        let outcome = engine.screen(&docs, &criteria).unwrap();
        let batch = &outcome.batches[0];
        let find = |id: &str| batch.results.iter().find(|r| r.document_id == id).unwrap();
        assert!(find("hit").exclusion_reasons.is_empty());
        assert!(
            find("miss")
                .exclusion_reasons
                .iter()
                .any(|r| r.contains("below minimum relevance tier"))
        );
    }

    #[test]
    fn test_statistics_per_batch() {
        let engine = ScreeningEngine::new(4).unwrap();
        let outcome = engine.screen(&ten_docs(), &quantum_criteria()).unwrap();
        for batch in &outcome.batches {
            assert_eq!(batch.statistics.total, batch.results.len());
            // Every doc matches keyword + methodology: 2.0 + 1.0 → High.
            assert_eq!(batch.statistics.high, batch.results.len());
        }
    }
}
