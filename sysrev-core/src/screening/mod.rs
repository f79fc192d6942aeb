//! Batched screening and ranking of candidate documents.
//!
//! Pure scoring heuristics (methodology classification, relevance scoring,
//! theme extraction) sit under a batching engine that assigns within-batch
//! priority ranks and aggregates statistics.

pub mod criteria;
pub mod engine;
pub mod methodology;
pub mod relevance;
pub mod themes;

pub use criteria::{
    BatchStatistics, Methodology, RelevanceTier, ScreeningBatch, ScreeningCriteria,
    ScreeningResult, Theme,
};
pub use engine::{BatchAbort, ScreeningEngine, ScreeningOutcome};
pub use relevance::RelevanceVerdict;
