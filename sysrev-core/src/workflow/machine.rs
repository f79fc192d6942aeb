//! The workflow state machine.
//!
//! Drives the four pipeline stages in fixed order, recording each stage's
//! output as an appended checkpoint. History is append-only except for
//! explicit rewind. A failed stage moves the machine into the absorbing
//! `Error` phase without touching recorded checkpoints; rewind is the
//! recovery path back to the last good one.

use super::checkpoint::{Checkpoint, CheckpointEdit, ReviewStep, StepPayload};
use crate::audit::{AuditEventKind, AuditTrail};
use crate::config::ReviewConfig;
use crate::error::{ProviderError, ScreeningError, SysrevError, WorkflowError};
use crate::providers::{
    DocumentSearchProvider, KeywordAnalyzer, PersistenceSink, QuestionFormulator, Screener,
    SearchExecutor, SearchRequest, with_deadline,
};
use crate::screening::{ScreeningCriteria, ScreeningResult};
use crate::types::{Document, SearchStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Where the machine is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Initializing,
    QuestionFormulation,
    KeywordAnalysis,
    PaperSearch,
    AbstractScreening,
    Completed,
    Error,
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowPhase::Initializing => "initializing",
            WorkflowPhase::QuestionFormulation => "question_formulation",
            WorkflowPhase::KeywordAnalysis => "keyword_analysis",
            WorkflowPhase::PaperSearch => "paper_search",
            WorkflowPhase::AbstractScreening => "abstract_screening",
            WorkflowPhase::Completed => "completed",
            WorkflowPhase::Error => "error",
        };
        write!(f, "{name}")
    }
}

fn phase_for(step: ReviewStep) -> WorkflowPhase {
    match step {
        ReviewStep::Questions => WorkflowPhase::QuestionFormulation,
        ReviewStep::Keywords => WorkflowPhase::KeywordAnalysis,
        ReviewStep::Papers => WorkflowPhase::PaperSearch,
        ReviewStep::Screening => WorkflowPhase::AbstractScreening,
    }
}

/// Result of [`ReviewWorkflow::advance`]: a new checkpoint, or the
/// completion sentinel once the final stage has already run.
#[derive(Debug)]
pub enum Advance<'a> {
    Checkpoint(&'a Checkpoint),
    Complete,
}

/// The checkpointed review pipeline.
///
/// Not a shared-state machine: one instance per in-flight review, mutated
/// by a single orchestrating caller.
pub struct ReviewWorkflow {
    config: ReviewConfig,
    formulator: Arc<dyn QuestionFormulator>,
    analyzer: Arc<dyn KeywordAnalyzer>,
    search_provider: Arc<dyn DocumentSearchProvider>,
    screener: Arc<dyn Screener>,
    executor: SearchExecutor,
    audit: AuditTrail,
    phase: WorkflowPhase,
    history: Vec<Checkpoint>,
    error_message: Option<String>,
}

impl ReviewWorkflow {
    pub fn new(
        config: ReviewConfig,
        formulator: Arc<dyn QuestionFormulator>,
        analyzer: Arc<dyn KeywordAnalyzer>,
        search_provider: Arc<dyn DocumentSearchProvider>,
        screener: Arc<dyn Screener>,
    ) -> Self {
        let executor =
            SearchExecutor::new(config.retry.clone(), config.workflow.stage_timeout_secs);
        Self {
            config,
            formulator,
            analyzer,
            search_provider,
            screener,
            executor,
            audit: AuditTrail::disabled(),
            phase: WorkflowPhase::Initializing,
            history: Vec::new(),
            error_message: None,
        }
    }

    /// Attach an audit sink. Sink failures never abort the workflow.
    pub fn with_audit(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.audit = AuditTrail::new(sink);
        self
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    /// The current checkpoint, always the last element of history.
    pub fn current(&self) -> Option<&Checkpoint> {
        self.history.last()
    }

    pub fn history(&self) -> &[Checkpoint] {
        &self.history
    }

    /// Begin a review: formulate the research question and reset history
    /// to that single root checkpoint. A formulator failure leaves the
    /// machine in the `Error` phase.
    pub async fn start(&mut self, research_idea: &str) -> Result<&Checkpoint, SysrevError> {
        info!(research_idea = research_idea, "Starting review workflow");
        let constraints = HashMap::new();
        let question = match with_deadline(
            "formulator",
            self.config.workflow.stage_timeout_secs,
            self.formulator.formulate(research_idea, &constraints),
        )
        .await
        {
            Ok(question) => question,
            Err(e) => return Err(self.fail_stage("formulator", e.into()).await),
        };

        self.history = vec![Checkpoint::new(StepPayload::Question(question))];
        self.phase = WorkflowPhase::QuestionFormulation;
        self.error_message = None;
        self.audit
            .record(AuditEventKind::WorkflowStarted { research_idea: research_idea.to_string() })
            .await;
        self.audit
            .record(AuditEventKind::CheckpointRecorded { step: ReviewStep::Questions })
            .await;
        self.current()
            .ok_or_else(|| WorkflowError::NotStarted { operation: "start" }.into())
    }

    /// Run the next pipeline stage and append its checkpoint.
    ///
    /// From the screening step there is nothing left to run; the machine
    /// moves to `Completed` and returns [`Advance::Complete`], idempotently
    /// on repeated calls.
    pub async fn advance(&mut self) -> Result<Advance<'_>, SysrevError> {
        if self.phase == WorkflowPhase::Error {
            return Err(self.errored("advance"));
        }
        let current = self
            .history
            .last()
            .ok_or(WorkflowError::NotStarted { operation: "advance" })?;

        let payload = match current.payload.clone() {
            StepPayload::Question(question) => {
                let strategy = match with_deadline(
                    "analyzer",
                    self.config.workflow.stage_timeout_secs,
                    self.analyzer.analyze(&question),
                )
                .await
                {
                    Ok(strategy) => strategy,
                    Err(e) => return Err(self.fail_stage("analyzer", e.into()).await),
                };
                StepPayload::Strategy(strategy)
            }
            StepPayload::Strategy(strategy) => {
                let documents = match self.run_search(&strategy).await {
                    Ok(documents) => documents,
                    Err(e) => return Err(self.fail_stage("search", e).await),
                };
                StepPayload::Documents(documents)
            }
            StepPayload::Documents(documents) => {
                let results = match self.run_screening(&documents).await {
                    Ok(results) => results,
                    Err(e) => return Err(self.fail_stage("screener", e).await),
                };
                StepPayload::Screening(results)
            }
            StepPayload::Screening(results) => {
                self.phase = WorkflowPhase::Completed;
                self.audit
                    .record(AuditEventKind::WorkflowCompleted { total_screened: results.len() })
                    .await;
                return Ok(Advance::Complete);
            }
        };

        let step = payload.step();
        self.history.push(Checkpoint::new(payload));
        self.phase = phase_for(step);
        self.audit.record(AuditEventKind::CheckpointRecorded { step }).await;
        info!(step = %step, checkpoints = self.history.len(), "Advanced workflow");
        match self.current() {
            Some(checkpoint) => Ok(Advance::Checkpoint(checkpoint)),
            None => Err(WorkflowError::NotStarted { operation: "advance" }.into()),
        }
    }

    /// Apply a typed user edit to the current checkpoint in place.
    ///
    /// Does not advance the step. Mismatched edit shapes are rejected
    /// without touching the payload.
    pub async fn modify(&mut self, edit: &CheckpointEdit) -> Result<&Checkpoint, SysrevError> {
        if self.phase == WorkflowPhase::Error {
            return Err(self.errored("modify"));
        }
        let checkpoint = self
            .history
            .last_mut()
            .ok_or(WorkflowError::NotStarted { operation: "modify" })?;
        checkpoint.apply_edit(edit)?;
        let step = checkpoint.step();
        self.audit.record(AuditEventKind::CheckpointModified { step }).await;
        self.current()
            .ok_or_else(|| WorkflowError::NotStarted { operation: "modify" }.into())
    }

    /// Step back to the previous checkpoint.
    ///
    /// Pops the current checkpoint and returns the new tail, or `None`
    /// (history untouched) when only the root checkpoint remains. From the
    /// `Error` phase nothing is popped: a failed stage never appended a
    /// checkpoint, so recovery just restores the phase of the last good one.
    pub async fn rewind(&mut self) -> Option<&Checkpoint> {
        if self.phase == WorkflowPhase::Error {
            let step = self.history.last()?.step();
            self.phase = phase_for(step);
            self.error_message = None;
            self.audit.record(AuditEventKind::Rewound { to_step: step }).await;
            return self.current();
        }

        if self.history.len() < 2 {
            return None;
        }
        self.history.pop();
        let step = self.history.last()?.step();
        self.phase = phase_for(step);
        self.audit.record(AuditEventKind::Rewound { to_step: step }).await;
        self.current()
    }

    /// The screened results ranked by relevance, highest first.
    ///
    /// Valid only once the screening checkpoint exists; ties keep their
    /// within-batch order.
    pub fn final_results(&self) -> Result<Vec<ScreeningResult>, SysrevError> {
        let current = self
            .history
            .last()
            .ok_or(WorkflowError::NotStarted { operation: "final_results" })?;
        let StepPayload::Screening(results) = &current.payload else {
            return Err(WorkflowError::IllegalState {
                operation: "final_results",
                step: current.step(),
            }
            .into());
        };
        let mut ranked = results.clone();
        ranked.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(ranked)
    }

    async fn run_search(&self, strategy: &SearchStrategy) -> Result<Vec<Document>, SysrevError> {
        let query = strategy
            .combinations
            .first()
            .cloned()
            .unwrap_or_else(|| strategy.keywords.join(" AND "));
        let categories = strategy
            .constraints
            .get("categories")
            .and_then(|v| v.as_array())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        let request = SearchRequest::new(query, categories, &self.config.search)?;
        self.executor
            .execute(self.search_provider.as_ref(), &request)
            .await
    }

    async fn run_screening(
        &self,
        documents: &[Document],
    ) -> Result<Vec<ScreeningResult>, SysrevError> {
        let criteria = self.screening_criteria();
        let timeout = Duration::from_secs(self.config.workflow.stage_timeout_secs);
        let outcome =
            match tokio::time::timeout(timeout, self.screener.screen(documents, &criteria)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(ProviderError::Timeout {
                        stage: "screener",
                        timeout_secs: self.config.workflow.stage_timeout_secs,
                    }
                    .into());
                }
            };

        if outcome.batches.is_empty() {
            let message = match outcome.aborted {
                Some(abort) => abort.error.to_string(),
                None => "screener returned no batches".to_string(),
            };
            return Err(ScreeningError::NoBatchCompleted { message }.into());
        }
        if let Some(abort) = &outcome.aborted {
            warn!(
                batch = abort.batch_number,
                error = %abort.error,
                "Screening batch aborted; keeping completed batches"
            );
            self.audit
                .record(AuditEventKind::BatchAborted {
                    batch_number: abort.batch_number,
                    message: abort.error.to_string(),
                })
                .await;
        }
        Ok(outcome.into_results())
    }

    /// Criteria for the screening stage: required keywords come from the
    /// most recent strategy checkpoint.
    fn screening_criteria(&self) -> ScreeningCriteria {
        let keywords = self
            .history
            .iter()
            .rev()
            .find_map(|cp| match &cp.payload {
                StepPayload::Strategy(strategy) => Some(strategy.keywords.clone()),
                _ => None,
            })
            .unwrap_or_default();
        ScreeningCriteria { required_keywords: keywords, ..ScreeningCriteria::default() }
    }

    async fn fail_stage(&mut self, stage: &'static str, error: SysrevError) -> SysrevError {
        warn!(stage = stage, error = %error, "Pipeline stage failed; entering error phase");
        self.phase = WorkflowPhase::Error;
        self.error_message = Some(error.to_string());
        self.audit
            .record(AuditEventKind::StageFailed {
                stage: stage.to_string(),
                message: error.to_string(),
            })
            .await;
        error
    }

    fn errored(&self, operation: &'static str) -> SysrevError {
        let message = match &self.error_message {
            Some(message) => format!("{operation} refused: {message}"),
            None => format!("{operation} refused"),
        };
        WorkflowError::Errored { message }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReviewConfig;
    use crate::providers::mock::{MockAnalyzer, MockFormulator, MockSearchProvider, MockSink};
    use crate::providers::{HeuristicScreener, SearchPage};
    use crate::screening::RelevanceTier;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn documents() -> Vec<Document> {
        vec![
            Document::new(
                "d1",
                "Quantum learning experiment",
                "We present a quantum learning experiment with measurement results.",
            ),
            Document::new(
                "d2",
                "Classical optimization",
                "A theory of classical optimization with a framework and model.",
            ),
            Document::new(
                "d3",
                "Quantum learning survey",
                "A survey of quantum learning methods across quantum systems.",
            ),
        ]
    }

    fn workflow_with(provider: Arc<dyn DocumentSearchProvider>) -> ReviewWorkflow {
        let mut config = ReviewConfig::default();
        config.workflow.stage_timeout_secs = 5;
        config.retry.initial_backoff_ms = 1;
        config.retry.max_backoff_ms = 1;
        ReviewWorkflow::new(
            config,
            Arc::new(MockFormulator::new()),
            Arc::new(MockAnalyzer::with_keywords(&["quantum", "learning"])),
            provider,
            Arc::new(HeuristicScreener::new(2)),
        )
    }

    fn workflow() -> ReviewWorkflow {
        workflow_with(Arc::new(MockSearchProvider::with_documents(documents())))
    }

    struct FailingProvider;

    #[async_trait]
    impl DocumentSearchProvider for FailingProvider {
        async fn search(
            &self,
            _request: &SearchRequest,
            _offset: usize,
        ) -> Result<SearchPage, ProviderError> {
            Err(ProviderError::Failed { stage: "search", message: "index offline".into() })
        }
    }

    #[tokio::test]
    async fn test_advance_visits_steps_in_fixed_order() {
        let mut wf = workflow();
        let cp = wf.start("quantum machine learning").await.unwrap();
        assert_eq!(cp.step(), ReviewStep::Questions);
        assert_eq!(wf.phase(), WorkflowPhase::QuestionFormulation);

        let expected = [
            (ReviewStep::Keywords, WorkflowPhase::KeywordAnalysis),
            (ReviewStep::Papers, WorkflowPhase::PaperSearch),
            (ReviewStep::Screening, WorkflowPhase::AbstractScreening),
        ];
        for (step, phase) in expected {
            match wf.advance().await.unwrap() {
                Advance::Checkpoint(cp) => assert_eq!(cp.step(), step),
                Advance::Complete => panic!("completed early at {step}"),
            }
            assert_eq!(wf.phase(), phase);
        }

        assert!(matches!(wf.advance().await.unwrap(), Advance::Complete));
        assert_eq!(wf.phase(), WorkflowPhase::Completed);
        // Completion is idempotent.
        assert!(matches!(wf.advance().await.unwrap(), Advance::Complete));
        assert_eq!(wf.history().len(), 4);
    }

    #[tokio::test]
    async fn test_advance_before_start_fails() {
        let mut wf = workflow();
        let err = wf.advance().await.unwrap_err();
        assert!(matches!(
            err,
            SysrevError::Workflow(WorkflowError::NotStarted { operation: "advance" })
        ));
    }

    #[tokio::test]
    async fn test_failed_stage_enters_error_and_refuses_advance() {
        let mut wf = workflow_with(Arc::new(FailingProvider));
        wf.start("quantum machine learning").await.unwrap();
        wf.advance().await.unwrap(); // keywords
        let err = wf.advance().await.unwrap_err(); // search fails
        assert!(matches!(err, SysrevError::Provider(ProviderError::Failed { .. })));
        assert_eq!(wf.phase(), WorkflowPhase::Error);

        let err = wf.advance().await.unwrap_err();
        assert!(matches!(err, SysrevError::Workflow(WorkflowError::Errored { .. })));
        let err = wf
            .modify(&CheckpointEdit::Strategy { keywords: None, combinations: None })
            .await
            .unwrap_err();
        assert!(matches!(err, SysrevError::Workflow(WorkflowError::Errored { .. })));
    }

    #[tokio::test]
    async fn test_rewind_from_error_recovers_last_good_checkpoint() {
        let mut wf = workflow_with(Arc::new(FailingProvider));
        wf.start("quantum machine learning").await.unwrap();
        wf.advance().await.unwrap();
        wf.advance().await.unwrap_err();
        assert_eq!(wf.history().len(), 2); // failure appended nothing

        let cp = wf.rewind().await.unwrap();
        assert_eq!(cp.step(), ReviewStep::Keywords);
        assert_eq!(wf.phase(), WorkflowPhase::KeywordAnalysis);
        assert_eq!(wf.history().len(), 2); // error recovery does not pop
    }

    #[tokio::test]
    async fn test_rewind_pops_tail_and_root_is_sticky() {
        let mut wf = workflow();
        wf.start("quantum machine learning").await.unwrap();
        wf.advance().await.unwrap();
        assert_eq!(wf.history().len(), 2);

        let cp = wf.rewind().await.unwrap();
        assert_eq!(cp.step(), ReviewStep::Questions);
        assert_eq!(wf.history().len(), 1);

        assert!(wf.rewind().await.is_none());
        assert_eq!(wf.history().len(), 1);
        assert_eq!(wf.current().unwrap().step(), ReviewStep::Questions);
    }

    #[tokio::test]
    async fn test_modify_patches_current_without_advancing() {
        let mut wf = workflow();
        wf.start("quantum machine learning").await.unwrap();
        let cp = wf
            .modify(&CheckpointEdit::Question {
                main_question: Some("How does quantum data encoding affect learning?".into()),
                sub_questions: None,
            })
            .await
            .unwrap();
        assert!(cp.modified_by_user);
        assert_eq!(cp.step(), ReviewStep::Questions);
        let StepPayload::Question(q) = &cp.payload else {
            panic!("payload kind changed");
        };
        assert_eq!(q.main_question, "How does quantum data encoding affect learning?");

        assert_eq!(wf.history().len(), 1);
    }

    #[tokio::test]
    async fn test_final_results_sorted_by_relevance() {
        let mut wf = workflow();
        wf.start("quantum machine learning").await.unwrap();
        for _ in 0..3 {
            wf.advance().await.unwrap();
        }
        let results = wf.final_results().unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        // d1 and d3 mention both keywords, d2 neither.
        assert_eq!(results[2].document_id, "d2");
        assert_eq!(results[2].tier, RelevanceTier::Irrelevant);
    }

    #[tokio::test]
    async fn test_final_results_before_screening_is_illegal() {
        let mut wf = workflow();
        wf.start("quantum machine learning").await.unwrap();
        let err = wf.final_results().unwrap_err();
        assert!(matches!(
            err,
            SysrevError::Workflow(WorkflowError::IllegalState {
                operation: "final_results",
                step: ReviewStep::Questions,
            })
        ));
    }

    #[tokio::test]
    async fn test_relevance_override_applies_to_screening_checkpoint() {
        let mut wf = workflow();
        wf.start("quantum machine learning").await.unwrap();
        for _ in 0..3 {
            wf.advance().await.unwrap();
        }
        let overrides = HashMap::from([("d2".to_string(), 1.0f32)]);
        wf.modify(&CheckpointEdit::RelevanceOverrides(overrides)).await.unwrap();

        let results = wf.final_results().unwrap();
        assert_eq!(results[0].document_id, "d2");
        assert_eq!(results[0].tier, RelevanceTier::High);
        assert!(results[0].user_reviewed);
    }

    #[tokio::test]
    async fn test_start_resets_history_after_error() {
        let mut wf = workflow_with(Arc::new(FailingProvider));
        wf.start("quantum machine learning").await.unwrap();
        wf.advance().await.unwrap();
        wf.advance().await.unwrap_err();
        assert_eq!(wf.phase(), WorkflowPhase::Error);

        let cp = wf.start("a fresh idea").await.unwrap();
        assert_eq!(cp.step(), ReviewStep::Questions);
        assert_eq!(wf.history().len(), 1);
        assert_eq!(wf.phase(), WorkflowPhase::QuestionFormulation);
    }

    #[tokio::test]
    async fn test_audit_trail_records_run() {
        let sink = Arc::new(MockSink::new());
        let mut wf = workflow().with_audit(sink.clone());
        wf.start("quantum machine learning").await.unwrap();
        for _ in 0..3 {
            wf.advance().await.unwrap();
        }
        wf.advance().await.unwrap(); // completion sentinel

        let records = sink.records.lock().unwrap();
        // started + 4 checkpoints + completed
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].1["kind"], "workflow_started");
        assert_eq!(records[5].1["kind"], "workflow_completed");
    }
}
