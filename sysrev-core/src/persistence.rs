//! Local persistence for review runs.
//!
//! A run's checkpoint history is written as a single JSON file per run.
//! Writes go through a temp-file-and-rename so a crash mid-write never
//! leaves a truncated run file behind.

use crate::error::Result;
use crate::workflow::{Checkpoint, WorkflowPhase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Serialize `value` to `path` atomically.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load a JSON file written by [`atomic_write_json`].
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// One persisted review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRun {
    pub id: String,
    pub research_idea: String,
    pub phase: WorkflowPhase,
    pub saved_at: DateTime<Utc>,
    pub history: Vec<Checkpoint>,
}

impl SavedRun {
    pub fn new(research_idea: impl Into<String>, phase: WorkflowPhase, history: Vec<Checkpoint>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            research_idea: research_idea.into(),
            phase,
            saved_at: Utc::now(),
            history,
        }
    }
}

/// Catalog entry for a stored run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub research_idea: String,
    pub phase: WorkflowPhase,
    pub saved_at: DateTime<Utc>,
    pub checkpoints: usize,
}

/// Directory-backed store of review runs, one JSON file per run.
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn run_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Persist a run; overwrites any previous save with the same id.
    pub fn save(&self, run: &SavedRun) -> Result<PathBuf> {
        let path = self.run_path(&run.id);
        atomic_write_json(&path, run)?;
        debug!(id = %run.id, path = %path.display(), "Saved review run");
        Ok(path)
    }

    pub fn load(&self, id: &str) -> Result<SavedRun> {
        load_json(&self.run_path(id))
    }

    /// Summaries of every stored run, newest save first.
    ///
    /// Files that fail to parse are skipped; the store directory may hold
    /// foreign files.
    pub fn list(&self) -> Result<Vec<RunSummary>> {
        let mut summaries = Vec::new();
        if !self.dir.exists() {
            return Ok(summaries);
        }
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(run) = load_json::<SavedRun>(&path) else {
                debug!(path = %path.display(), "Skipping unreadable run file");
                continue;
            };
            summaries.push(RunSummary {
                checkpoints: run.history.len(),
                id: run.id,
                research_idea: run.research_idea,
                phase: run.phase,
                saved_at: run.saved_at,
            });
        }
        summaries.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(summaries)
    }
}
