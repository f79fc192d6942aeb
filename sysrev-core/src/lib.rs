//! Core library for `sysrev`, a staged literature-review pipeline.
//!
//! The pipeline turns a free-form research idea into a ranked, themed set of
//! screened papers in four stages: question formulation, keyword analysis,
//! paper search, and abstract screening. Each stage's output is recorded as
//! a checkpoint in a [`workflow::ReviewWorkflow`], which supports rewind and
//! in-place user edits between stages.
//!
//! External collaborators (question formulator, keyword analyzer, search
//! provider, screener) are trait objects behind [`providers`]; local
//! heuristic implementations ship with the crate so the pipeline runs
//! offline.

pub mod audit;
pub mod config;
pub mod error;
pub mod persistence;
pub mod providers;
pub mod report;
pub mod screening;
pub mod types;
pub mod workflow;

pub use config::{ReviewConfig, load_config};
pub use error::{Result, SysrevError};
pub use report::ReviewReport;
pub use types::{Document, ResearchQuestion, SearchStrategy};
pub use workflow::{Advance, Checkpoint, CheckpointEdit, ReviewStep, ReviewWorkflow, WorkflowPhase};
