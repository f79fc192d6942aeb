//! Core data model shared across pipeline stages.
//!
//! These types flow forward through the workflow: a `ResearchQuestion`
//! produces a `SearchStrategy`, which produces `Document`s, which the
//! screening engine turns into ranked results.

use crate::error::ScreeningError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A formulated research question, produced by the question formulator.
///
/// Mutated only through explicit workflow edits; immutable otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchQuestion {
    /// The main research question.
    pub main_question: String,
    /// Related sub-questions, in priority order.
    pub sub_questions: Vec<String>,
    /// Free-form context carried along for downstream stages.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    /// Validation score in [0, 1] from the formulator.
    pub validation_score: f32,
    /// Whether the user has explicitly approved this question.
    #[serde(default)]
    pub user_approved: bool,
}

/// A search strategy derived from a research question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchStrategy {
    /// Individual search keywords, in priority order.
    pub keywords: Vec<String>,
    /// Boolean query expressions combining the keywords.
    pub combinations: Vec<String>,
    /// Search constraints (date ranges, categories, ...).
    #[serde(default)]
    pub constraints: HashMap<String, serde_json::Value>,
    /// Whether the user has explicitly approved this strategy.
    #[serde(default)]
    pub user_approved: bool,
}

/// A candidate paper fetched from the document index.
///
/// Immutable once fetched; `id` is the identity key within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier within a run (e.g. an arXiv id).
    pub id: String,
    /// Paper title.
    pub title: String,
    /// Paper abstract.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Author names.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Additional metadata: categories, dates, URLs.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Document {
    /// Create a document with the minimum fields the scorer needs.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
            authors: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Return the title, or a `MissingField` error if it is empty.
    pub fn require_title(&self) -> std::result::Result<&str, ScreeningError> {
        if self.title.trim().is_empty() {
            return Err(ScreeningError::MissingField {
                document_id: self.id.clone(),
                field: "title",
            });
        }
        Ok(&self.title)
    }

    /// Return the abstract, or a `MissingField` error if it is empty.
    pub fn require_abstract(&self) -> std::result::Result<&str, ScreeningError> {
        if self.abstract_text.trim().is_empty() {
            return Err(ScreeningError::MissingField {
                document_id: self.id.clone(),
                field: "abstract",
            });
        }
        Ok(&self.abstract_text)
    }
}
