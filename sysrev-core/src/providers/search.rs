//! Search execution: request validation, retry-wrapped page fetches, and
//! offset-resuming pagination over a [`DocumentSearchProvider`].

use super::{DocumentSearchProvider, with_deadline, with_retry};
use crate::config::{RetryConfig, SearchConfig};
use crate::error::{SearchError, SysrevError};
use crate::types::Document;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Categories accepted by the paper index. Values outside this list are a
/// local validation error and are never sent to the provider.
pub const VALID_CATEGORIES: &[&str] = &[
    "cs.AI", "quant-ph", "cs.LG", "cs.CL", "cs.NE", "stat.ML", "cs.CV", "cs.RO", "cs.HC",
];

/// A validated search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The boolean query expression.
    pub query: String,
    /// Maximum number of documents to fetch in total.
    pub max_results: usize,
    /// Category filters; empty means no filter.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Documents requested per page.
    pub page_size: usize,
}

impl SearchRequest {
    /// Build a request from config, validating query and categories.
    pub fn new(
        query: impl Into<String>,
        categories: Vec<String>,
        config: &SearchConfig,
    ) -> Result<Self, SearchError> {
        let request = Self {
            query: query.into(),
            max_results: config.max_results,
            categories,
            page_size: config.page_size,
        };
        request.validate()?;
        Ok(request)
    }

    /// Check query, result bounds, and categories against the allow-list.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if self.max_results == 0 {
            return Err(SearchError::InvalidMaxResults);
        }
        for category in &self.categories {
            if !VALID_CATEGORIES.contains(&category.as_str()) {
                return Err(SearchError::InvalidCategory {
                    category: category.clone(),
                    valid: VALID_CATEGORIES.join(", "),
                });
            }
        }
        Ok(())
    }
}

/// One page of provider results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub documents: Vec<Document>,
    /// Whether the provider has more results past this page.
    pub has_more: bool,
}

/// Drives paginated search against a provider, retrying transient page
/// failures with backoff and resuming from the last fetched offset.
pub struct SearchExecutor {
    retry: RetryConfig,
    timeout_secs: u64,
}

impl SearchExecutor {
    pub fn new(retry: RetryConfig, timeout_secs: u64) -> Self {
        Self { retry, timeout_secs }
    }

    /// Fetch up to `request.max_results` documents.
    ///
    /// Pages are requested sequentially; each page fetch runs under a
    /// deadline and is retried on transient failure. A page failure after
    /// retries surfaces with the documents fetched so far discarded by the
    /// caller, but the offset-based contract lets a later run resume.
    pub async fn execute(
        &self,
        provider: &dyn DocumentSearchProvider,
        request: &SearchRequest,
    ) -> Result<Vec<Document>, SysrevError> {
        request.validate()?;
        self.execute_from(provider, request, 0).await
    }

    /// Fetch starting at `offset`, for resuming a partial run.
    pub async fn execute_from(
        &self,
        provider: &dyn DocumentSearchProvider,
        request: &SearchRequest,
        offset: usize,
    ) -> Result<Vec<Document>, SysrevError> {
        let mut documents: Vec<Document> = Vec::new();
        let mut offset = offset;

        while documents.len() < request.max_results {
            let page = with_retry(&self.retry, || {
                with_deadline("search", self.timeout_secs, provider.search(request, offset))
            })
            .await?;

            let fetched = page.documents.len();
            offset += fetched;
            documents.extend(page.documents);
            info!(
                offset = offset,
                fetched = fetched,
                total = documents.len(),
                has_more = page.has_more,
                "Fetched search page"
            );

            if fetched == 0 || !page.has_more {
                break;
            }
        }

        documents.truncate(request.max_results);
        Ok(documents)
    }
}
