//! Local backends for the CLI: a JSON-file document corpus standing in for
//! a remote paper index, and a JSON-lines audit sink.

use async_trait::async_trait;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sysrev_core::Document;
use sysrev_core::error::ProviderError;
use sysrev_core::providers::{DocumentSearchProvider, PersistenceSink, SearchPage, SearchRequest};

/// Serves search pages out of a JSON file of documents.
///
/// Matching is a keyword OR over title and abstract; boolean connectives in
/// the query are treated as plain separators.
pub struct CorpusProvider {
    documents: Vec<Document>,
}

impl CorpusProvider {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read corpus file {}: {e}", path.display()))?;
        let documents: Vec<Document> = serde_json::from_str(&json)
            .map_err(|e| anyhow::anyhow!("corpus file {} is not a document array: {e}", path.display()))?;
        Ok(Self { documents })
    }

    #[cfg(test)]
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    fn terms(query: &str) -> Vec<String> {
        query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| *t != "and" && *t != "or" && *t != "not")
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|t| t.len() > 2)
            .collect()
    }
}

#[async_trait]
impl DocumentSearchProvider for CorpusProvider {
    async fn search(
        &self,
        request: &SearchRequest,
        offset: usize,
    ) -> Result<SearchPage, ProviderError> {
        let terms = Self::terms(&request.query);
        let matching: Vec<&Document> = self
            .documents
            .iter()
            .filter(|doc| {
                let haystack =
                    format!("{} {}", doc.title.to_lowercase(), doc.abstract_text.to_lowercase());
                terms.is_empty() || terms.iter().any(|t| haystack.contains(t))
            })
            .collect();

        let end = (offset + request.page_size).min(matching.len());
        let documents = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|doc| (*doc).clone())
            .collect();
        Ok(SearchPage { documents, has_more: end < matching.len() })
    }
}

/// Appends audit records as JSON lines to a local file.
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<fs::File>,
}

impl JsonlSink {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PersistenceSink for JsonlSink {
    async fn record(
        &self,
        collection: &str,
        record: serde_json::Value,
        id: Option<&str>,
    ) -> Result<String, ProviderError> {
        let assigned = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let line =
            serde_json::json!({ "id": assigned, "collection": collection, "record": record });
        let mut file = self.file.lock().map_err(|_| ProviderError::Failed {
            stage: "persistence",
            message: "audit file lock poisoned".into(),
        })?;
        writeln!(file, "{line}").map_err(|e| ProviderError::Transient {
            stage: "persistence",
            message: format!("audit append failed: {e}"),
        })?;
        Ok(assigned)
    }
}
