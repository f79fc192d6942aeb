//! Workflow checkpoints: one recorded state per pipeline step.
//!
//! A checkpoint's payload is a tagged union over the four step outputs, so
//! every consumption site matches exhaustively instead of inspecting a
//! free-form blob at runtime.

use crate::error::WorkflowError;
use crate::screening::ScreeningResult;
use crate::types::{Document, ResearchQuestion, SearchStrategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Pipeline step a checkpoint belongs to, in fixed advance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStep {
    Questions,
    Keywords,
    Papers,
    Screening,
}

impl fmt::Display for ReviewStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStep::Questions => write!(f, "questions"),
            ReviewStep::Keywords => write!(f, "keywords"),
            ReviewStep::Papers => write!(f, "papers"),
            ReviewStep::Screening => write!(f, "screening"),
        }
    }
}

/// The output of one pipeline stage, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StepPayload {
    Question(ResearchQuestion),
    Strategy(SearchStrategy),
    Documents(Vec<Document>),
    Screening(Vec<ScreeningResult>),
}

impl StepPayload {
    /// The step this payload belongs to.
    pub fn step(&self) -> ReviewStep {
        match self {
            StepPayload::Question(_) => ReviewStep::Questions,
            StepPayload::Strategy(_) => ReviewStep::Keywords,
            StepPayload::Documents(_) => ReviewStep::Papers,
            StepPayload::Screening(_) => ReviewStep::Screening,
        }
    }
}

/// A typed patch applied to the current checkpoint's payload.
///
/// Each variant is only valid against the matching payload kind; `None`
/// fields leave the existing value untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckpointEdit {
    /// Overwrite fields of the research question.
    Question {
        #[serde(default)]
        main_question: Option<String>,
        #[serde(default)]
        sub_questions: Option<Vec<String>>,
    },
    /// Overwrite fields of the search strategy.
    Strategy {
        #[serde(default)]
        keywords: Option<Vec<String>>,
        #[serde(default)]
        combinations: Option<Vec<String>>,
    },
    /// Per-document relevance overrides on the screened result list,
    /// keyed by document id.
    RelevanceOverrides(HashMap<String, f32>),
}

/// One recorded workflow state: a step's output plus bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The stage output.
    pub payload: StepPayload,
    /// When the checkpoint was recorded.
    pub created_at: DateTime<Utc>,
    /// Set when a user edit has been applied in place.
    pub modified_by_user: bool,
}

impl Checkpoint {
    /// Record a fresh checkpoint for a stage output.
    pub fn new(payload: StepPayload) -> Self {
        Self {
            payload,
            created_at: Utc::now(),
            modified_by_user: false,
        }
    }

    /// The step this checkpoint belongs to.
    pub fn step(&self) -> ReviewStep {
        self.payload.step()
    }

    /// Apply a typed edit to the payload in place.
    ///
    /// Fails with `InvalidEdit` when the edit kind does not match the
    /// payload kind, or when an override names an unknown document.
    pub fn apply_edit(&mut self, edit: &CheckpointEdit) -> Result<(), WorkflowError> {
        let step = self.step();
        match (&mut self.payload, edit) {
            (
                StepPayload::Question(question),
                CheckpointEdit::Question { main_question, sub_questions },
            ) => {
                if let Some(main) = main_question {
                    question.main_question = main.clone();
                }
                if let Some(subs) = sub_questions {
                    question.sub_questions = subs.clone();
                }
            }
            (
                StepPayload::Strategy(strategy),
                CheckpointEdit::Strategy { keywords, combinations },
            ) => {
                if let Some(kw) = keywords {
                    strategy.keywords = kw.clone();
                }
                if let Some(combos) = combinations {
                    strategy.combinations = combos.clone();
                }
            }
            (StepPayload::Screening(results), CheckpointEdit::RelevanceOverrides(overrides)) => {
                // Resolve every id before mutating anything so a bad edit
                // leaves the results untouched.
                let mut targets = Vec::with_capacity(overrides.len());
                for (document_id, score) in overrides {
                    let index = results
                        .iter()
                        .position(|r| &r.document_id == document_id)
                        .ok_or_else(|| WorkflowError::InvalidEdit {
                            step,
                            reason: format!("no screened document with id '{document_id}'"),
                        })?;
                    targets.push((index, *score));
                }
                for (index, score) in targets {
                    results[index].apply_override(score);
                }
            }
            (_, edit) => {
                return Err(WorkflowError::InvalidEdit {
                    step,
                    reason: format!("edit {} does not match payload", edit_kind(edit)),
                });
            }
        }
        self.modified_by_user = true;
        Ok(())
    }
}

fn edit_kind(edit: &CheckpointEdit) -> &'static str {
    match edit {
        CheckpointEdit::Question { .. } => "question",
        CheckpointEdit::Strategy { .. } => "strategy",
        CheckpointEdit::RelevanceOverrides(_) => "relevance_overrides",
    }
}
