//! Mock collaborators for tests and offline development.

use super::{
    DocumentSearchProvider, KeywordAnalyzer, PersistenceSink, QuestionFormulator, SearchPage,
    SearchRequest,
};
use crate::error::ProviderError;
use crate::types::{Document, ResearchQuestion, SearchStrategy};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Formulator returning a canned question, optionally failing first.
pub struct MockFormulator {
    pub fail: bool,
}

impl MockFormulator {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockFormulator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuestionFormulator for MockFormulator {
    async fn formulate(
        &self,
        research_idea: &str,
        _constraints: &HashMap<String, serde_json::Value>,
    ) -> Result<ResearchQuestion, ProviderError> {
        if self.fail {
            return Err(ProviderError::Failed {
                stage: "formulator",
                message: "mock formulation failure".into(),
            });
        }
        Ok(ResearchQuestion {
            main_question: format!("What is known about {research_idea}?"),
            sub_questions: vec![format!("What are open problems in {research_idea}?")],
            context: HashMap::new(),
            validation_score: 0.9,
            user_approved: false,
        })
    }
}

/// Analyzer returning a fixed keyword strategy.
pub struct MockAnalyzer {
    pub keywords: Vec<String>,
}

impl MockAnalyzer {
    pub fn with_keywords(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl KeywordAnalyzer for MockAnalyzer {
    async fn analyze(&self, _question: &ResearchQuestion) -> Result<SearchStrategy, ProviderError> {
        Ok(SearchStrategy {
            keywords: self.keywords.clone(),
            combinations: vec![self.keywords.join(" AND ")],
            constraints: HashMap::new(),
            user_approved: false,
        })
    }
}

/// Search provider serving a fixed document list, paged by `page_size`.
pub struct MockSearchProvider {
    documents: Vec<Document>,
}

impl MockSearchProvider {
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl DocumentSearchProvider for MockSearchProvider {
    async fn search(
        &self,
        request: &SearchRequest,
        offset: usize,
    ) -> Result<SearchPage, ProviderError> {
        let end = (offset + request.page_size).min(self.documents.len());
        let documents = self
            .documents
            .get(offset..end)
            .unwrap_or_default()
            .to_vec();
        Ok(SearchPage {
            documents,
            has_more: end < self.documents.len(),
        })
    }
}

/// Persistence sink capturing records in memory.
pub struct MockSink {
    pub records: Mutex<Vec<(String, serde_json::Value)>>,
    pub fail: bool,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A sink whose every call fails; the audit recorder must swallow it.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn recorded(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceSink for MockSink {
    async fn record(
        &self,
        collection: &str,
        record: serde_json::Value,
        id: Option<&str>,
    ) -> Result<String, ProviderError> {
        if self.fail {
            return Err(ProviderError::Transient {
                stage: "persistence",
                message: "mock sink unavailable".into(),
            });
        }
        let assigned = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.records
            .lock()
            .unwrap()
            .push((collection.to_string(), record));
        Ok(assigned)
    }
}
