//! Final review report: aggregate statistics over the ranked results plus
//! markdown rendering.

use crate::screening::{BatchStatistics, RelevanceTier, ScreeningResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;

/// Cross-batch themes are only reported once a name recurs more than this
/// many times across all results.
const THEME_FREQUENCY_FLOOR: usize = 2;
const TOP_THEMES: usize = 5;

/// The assembled output of a completed review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    /// The main research question the review answers.
    pub research_question: String,
    pub generated_at: DateTime<Utc>,
    /// Per-tier counts over every screened document.
    pub statistics: BatchStatistics,
    /// Results flagged for detailed review (High or Medium), ranked.
    pub relevant: Vec<ScreeningResult>,
    /// Recurring theme names with their cross-batch frequency, most
    /// frequent first, at most five.
    pub top_themes: Vec<(String, usize)>,
}

impl ReviewReport {
    /// Build a report from ranked results (highest relevance first).
    pub fn new(research_question: impl Into<String>, results: &[ScreeningResult]) -> Self {
        let relevant = results
            .iter()
            .filter(|r| r.tier >= RelevanceTier::Medium)
            .cloned()
            .collect();
        Self {
            research_question: research_question.into(),
            generated_at: Utc::now(),
            statistics: BatchStatistics::tally(results),
            relevant,
            top_themes: top_themes(results),
        }
    }

    /// Render the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Literature Review Report\n");
        let _ = writeln!(out, "## Research Question\n\n{}\n", self.research_question);

        let _ = writeln!(out, "## Summary\n");
        let _ = writeln!(out, "- Documents screened: {}", self.statistics.total);
        let _ = writeln!(
            out,
            "- Relevant (high/medium): {}",
            self.statistics.high + self.statistics.medium
        );
        let _ = writeln!(out, "- High relevance: {}", self.statistics.high);
        let _ = writeln!(out, "- Medium relevance: {}", self.statistics.medium);
        let _ = writeln!(out, "- Low relevance: {}", self.statistics.low);
        let _ = writeln!(out, "- Irrelevant: {}", self.statistics.irrelevant);

        if !self.top_themes.is_empty() {
            let _ = writeln!(out, "\n## Recurring Themes\n");
            for (name, frequency) in &self.top_themes {
                let _ = writeln!(out, "- {name} ({frequency} occurrences)");
            }
        }

        let _ = writeln!(out, "\n## Papers for Detailed Review\n");
        if self.relevant.is_empty() {
            let _ = writeln!(out, "No documents met the relevance bar.");
        }
        for (position, result) in self.relevant.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. **{}** ({}, {})",
                position + 1,
                result.title,
                result.tier,
                result.methodology
            );
            for reason in &result.inclusion_reasons {
                let _ = writeln!(out, "   - {reason}");
            }
            if result.user_reviewed {
                let _ = writeln!(out, "   - relevance manually reviewed");
            }
        }

        let _ = writeln!(
            out,
            "\n---\nGenerated at {}",
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
        out
    }
}

/// Aggregate theme names across all results, keeping names seen more than
/// [`THEME_FREQUENCY_FLOOR`] times. Ties sort by name for determinism.
fn top_themes(results: &[ScreeningResult]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for result in results {
        for theme in &result.themes {
            *counts.entry(theme.as_str()).or_default() += 1;
        }
    }
    let mut themes: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count > THEME_FREQUENCY_FLOOR)
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    themes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    themes.truncate(TOP_THEMES);
    themes
}
