//! Screening vocabulary: relevance tiers, methodology categories,
//! criteria, results, and themes.
//!
//! This is the single canonical definition of `RelevanceTier` and
//! `Methodology` for the whole crate. The scoring-to-tier mapping lives in
//! [`RelevanceTier::from_points`]; the stored `relevance_score` float is
//! always `tier.normalized()` unless a user override replaced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Categorical relevance bucket for a screened document.
///
/// Variant order defines ordinal value: `Irrelevant` = 0 through `High` = 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceTier {
    Irrelevant,
    Low,
    Medium,
    High,
}

impl RelevanceTier {
    /// Ordinal value: Irrelevant = 0, Low = 1, Medium = 2, High = 3.
    pub fn ordinal(self) -> u8 {
        match self {
            RelevanceTier::Irrelevant => 0,
            RelevanceTier::Low => 1,
            RelevanceTier::Medium => 2,
            RelevanceTier::High => 3,
        }
    }

    /// Normalized score in [0, 1]: `ordinal / 3`.
    pub fn normalized(self) -> f32 {
        f32::from(self.ordinal()) / 3.0
    }

    /// Bucket an additive point total into a tier.
    ///
    /// `>= 2.5` → High, `>= 1.5` → Medium, `>= 0.5` → Low, else Irrelevant.
    pub fn from_points(points: f32) -> Self {
        if points >= 2.5 {
            RelevanceTier::High
        } else if points >= 1.5 {
            RelevanceTier::Medium
        } else if points >= 0.5 {
            RelevanceTier::Low
        } else {
            RelevanceTier::Irrelevant
        }
    }

    /// Recover a tier from a normalized [0, 1] score by nearest bucket.
    ///
    /// Used when a user override replaces the derived float.
    pub fn from_normalized(score: f32) -> Self {
        let clamped = score.clamp(0.0, 1.0);
        match (clamped * 3.0).round() as u8 {
            0 => RelevanceTier::Irrelevant,
            1 => RelevanceTier::Low,
            2 => RelevanceTier::Medium,
            _ => RelevanceTier::High,
        }
    }
}

impl fmt::Display for RelevanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelevanceTier::Irrelevant => write!(f, "irrelevant"),
            RelevanceTier::Low => write!(f, "low"),
            RelevanceTier::Medium => write!(f, "medium"),
            RelevanceTier::High => write!(f, "high"),
        }
    }
}

/// Research methodology category classified from an abstract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Methodology {
    Experimental,
    Theoretical,
    Review,
    CaseStudy,
    Survey,
    MetaAnalysis,
    Other,
}

impl fmt::Display for Methodology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Methodology::Experimental => write!(f, "experimental"),
            Methodology::Theoretical => write!(f, "theoretical"),
            Methodology::Review => write!(f, "review"),
            Methodology::CaseStudy => write!(f, "case_study"),
            Methodology::Survey => write!(f, "survey"),
            Methodology::MetaAnalysis => write!(f, "meta_analysis"),
            Methodology::Other => write!(f, "other"),
        }
    }
}

/// Criteria applied when screening a document set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningCriteria {
    /// Keywords that should appear in the title or abstract.
    #[serde(default)]
    pub required_keywords: Vec<String>,
    /// Keywords that penalize a document when present.
    #[serde(default)]
    pub excluded_keywords: Vec<String>,
    /// Methodologies that earn a match bonus.
    #[serde(default)]
    pub methodology_types: BTreeSet<Methodology>,
    /// Minimum tier for a document to count as relevant in reports.
    #[serde(default = "default_min_tier")]
    pub min_relevance_tier: RelevanceTier,
    /// Free-form custom criteria passed through to LLM-backed screeners.
    #[serde(default)]
    pub custom_criteria: HashMap<String, serde_json::Value>,
}

fn default_min_tier() -> RelevanceTier {
    RelevanceTier::Low
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        Self {
            required_keywords: Vec::new(),
            excluded_keywords: Vec::new(),
            methodology_types: BTreeSet::new(),
            min_relevance_tier: default_min_tier(),
            custom_criteria: HashMap::new(),
        }
    }
}

/// A coarse topic signal: a significant token shared by several documents
/// in the same batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Theme {
    /// The shared token.
    pub name: String,
    /// Keywords making up the theme (currently the token itself).
    pub keywords: Vec<String>,
    /// Total token occurrences across the batch.
    pub frequency: usize,
    /// Ids of the documents the token appears in (always ≥ 2).
    pub document_ids: BTreeSet<String>,
    /// `min(frequency / batch_len, 1.0)`.
    pub confidence: f32,
}

/// Screening verdict for a single document.
///
/// Recomputed on every screening run; never partially mutated, except for
/// explicit user relevance overrides applied through the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResult {
    /// Id of the screened document.
    pub document_id: String,
    /// Document title, carried for report rendering.
    pub title: String,
    /// Categorical relevance bucket (canonical representation).
    pub tier: RelevanceTier,
    /// Normalized relevance in [0, 1]; `tier.normalized()` unless a user
    /// override replaced it.
    pub relevance_score: f32,
    /// Classified methodology.
    pub methodology: Methodology,
    /// Criteria matches that argue for inclusion.
    pub inclusion_reasons: Vec<String>,
    /// Criteria matches that argue for exclusion.
    pub exclusion_reasons: Vec<String>,
    /// Names of batch themes this document participates in.
    pub themes: Vec<String>,
    /// 1-based rank within the batch (1 = best).
    pub priority_rank: usize,
    /// Whether the document warrants a detailed full-text review.
    pub detailed_review_flag: bool,
    /// Set when a user relevance override was applied.
    #[serde(default)]
    pub user_reviewed: bool,
}

impl ScreeningResult {
    /// Apply a user relevance override: replace the float, re-derive the
    /// tier by nearest bucket, and mark the result reviewed.
    pub fn apply_override(&mut self, score: f32) {
        self.relevance_score = score.clamp(0.0, 1.0);
        self.tier = RelevanceTier::from_normalized(self.relevance_score);
        self.detailed_review_flag =
            matches!(self.tier, RelevanceTier::High | RelevanceTier::Medium);
        self.user_reviewed = true;
    }
}

/// Per-tier counts for one screened batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchStatistics {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub irrelevant: usize,
}

impl BatchStatistics {
    /// Tally statistics over a slice of results.
    pub fn tally(results: &[ScreeningResult]) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.tier {
                RelevanceTier::High => stats.high += 1,
                RelevanceTier::Medium => stats.medium += 1,
                RelevanceTier::Low => stats.low += 1,
                RelevanceTier::Irrelevant => stats.irrelevant += 1,
            }
        }
        stats
    }
}

/// One screened batch: ranked results, batch-local themes, and statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningBatch {
    /// 1-based batch number in submission order.
    pub batch_number: usize,
    /// Results sorted by relevance, with `priority_rank` assigned.
    pub results: Vec<ScreeningResult>,
    /// Themes extracted from this batch only.
    pub themes: Vec<Theme>,
    /// Per-tier counts.
    pub statistics: BatchStatistics,
    /// When the batch finished screening.
    pub screened_at: DateTime<Utc>,
}
