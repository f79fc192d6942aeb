//! The review workflow: checkpointed pipeline state and the machine that
//! drives it through question formulation, keyword analysis, paper search,
//! and abstract screening.

pub mod checkpoint;
pub mod machine;

pub use checkpoint::{Checkpoint, CheckpointEdit, ReviewStep, StepPayload};
pub use machine::{Advance, ReviewWorkflow, WorkflowPhase};
