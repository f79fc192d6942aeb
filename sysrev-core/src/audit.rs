//! Audit trail for workflow runs.
//!
//! Every notable transition is recorded as a sequence-numbered event through
//! a [`PersistenceSink`]. The sink is a side channel: a failed write is
//! logged and swallowed, never propagated into the workflow.

use crate::providers::PersistenceSink;
use crate::workflow::ReviewStep;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

const AUDIT_COLLECTION: &str = "audit_events";

/// What happened, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEventKind {
    WorkflowStarted { research_idea: String },
    CheckpointRecorded { step: ReviewStep },
    CheckpointModified { step: ReviewStep },
    Rewound { to_step: ReviewStep },
    StageFailed { stage: String, message: String },
    BatchAborted { batch_number: usize, message: String },
    WorkflowCompleted { total_screened: usize },
}

/// One audit record: monotone sequence number, timestamp, and the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: AuditEventKind,
}

/// Records audit events against an optional sink.
///
/// With no sink attached, events are still assigned sequence numbers and
/// emitted as debug logs, so the workflow code never branches on whether
/// auditing is enabled.
pub struct AuditTrail {
    sink: Option<Arc<dyn PersistenceSink>>,
    sequence: AtomicU64,
}

impl AuditTrail {
    /// A trail that only logs, persisting nothing.
    pub fn disabled() -> Self {
        Self { sink: None, sequence: AtomicU64::new(0) }
    }

    /// A trail persisting through `sink`.
    pub fn new(sink: Arc<dyn PersistenceSink>) -> Self {
        Self { sink: Some(sink), sequence: AtomicU64::new(0) }
    }

    /// Record one event. Sink failures are logged and swallowed.
    pub async fn record(&self, kind: AuditEventKind) {
        let event = AuditEvent {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            recorded_at: Utc::now(),
            kind,
        };
        debug!(sequence = event.sequence, event = ?event.kind, "Audit event");

        let Some(sink) = &self.sink else {
            return;
        };
        let record = match serde_json::to_value(&event) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to serialize audit event");
                return;
            }
        };
        if let Err(e) = sink.record(AUDIT_COLLECTION, record, None).await {
            warn!(sequence = event.sequence, error = %e, "Audit sink write failed; continuing");
        }
    }
}
