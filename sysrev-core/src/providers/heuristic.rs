//! Local heuristic collaborators.
//!
//! These implement the capability traits without any network or model
//! calls, so the full pipeline runs offline: question formulation by
//! template, keyword derivation by token significance, and screening via
//! the local engine.

use super::{KeywordAnalyzer, QuestionFormulator, Screener};
use crate::error::{ProviderError, SysrevError};
use crate::screening::{ScreeningCriteria, ScreeningEngine, ScreeningOutcome};
use crate::types::{Document, ResearchQuestion, SearchStrategy};
use async_trait::async_trait;
use std::collections::HashMap;

/// Formulates a structured research question from a free-form idea.
pub struct HeuristicFormulator;

#[async_trait]
impl QuestionFormulator for HeuristicFormulator {
    async fn formulate(
        &self,
        research_idea: &str,
        constraints: &HashMap<String, serde_json::Value>,
    ) -> Result<ResearchQuestion, ProviderError> {
        let idea = research_idea.trim();
        if idea.is_empty() {
            return Err(ProviderError::Failed {
                stage: "formulator",
                message: "research idea cannot be empty".into(),
            });
        }

        let mut context: HashMap<String, serde_json::Value> = constraints.clone();
        context.insert("field".into(), serde_json::Value::String(idea.to_string()));

        Ok(ResearchQuestion {
            main_question: format!(
                "What are the current state-of-the-art approaches in {idea}?"
            ),
            sub_questions: vec![
                format!("What are the key challenges in {idea}?"),
                format!("How do different approaches to {idea} compare in terms of performance?"),
                format!("What are the future research directions in {idea}?"),
            ],
            context,
            validation_score: 0.85,
            user_approved: false,
        })
    }
}

/// Derives a keyword strategy from a research question.
///
/// Keywords are significant tokens (length > 4) from the main question and
/// sub-questions, deduplicated in first-appearance order; combinations pair
/// consecutive keywords into boolean expressions.
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    fn extract_keywords(question: &ResearchQuestion) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::new();
        let texts = std::iter::once(question.main_question.as_str())
            .chain(question.sub_questions.iter().map(String::as_str));
        for text in texts {
            for token in text.to_lowercase().split_whitespace() {
                let token: String = token.chars().filter(|c| c.is_alphanumeric() || *c == '-').collect();
                if token.len() > 4 && !STOPLIKE.contains(&token.as_str()) && !keywords.contains(&token) {
                    keywords.push(token);
                }
            }
        }
        keywords
    }
}

/// Question-template words that carry no search signal.
const STOPLIKE: &[&str] = &[
    "what", "which", "approaches", "current", "state-of-the-art", "different",
    "compare", "terms", "performance", "challenges", "future", "research",
    "directions",
];

#[async_trait]
impl KeywordAnalyzer for HeuristicAnalyzer {
    async fn analyze(&self, question: &ResearchQuestion) -> Result<SearchStrategy, ProviderError> {
        let keywords = Self::extract_keywords(question);
        if keywords.is_empty() {
            return Err(ProviderError::Failed {
                stage: "analyzer",
                message: "no significant keywords in research question".into(),
            });
        }

        let mut combinations: Vec<String> = keywords
            .windows(2)
            .map(|pair| format!("\"{}\" AND \"{}\"", pair[0], pair[1]))
            .collect();
        if combinations.is_empty() {
            combinations.push(format!("\"{}\"", keywords[0]));
        }

        Ok(SearchStrategy {
            keywords,
            combinations,
            constraints: question.context.clone(),
            user_approved: false,
        })
    }
}

/// Screener backed entirely by the local heuristic engine.
pub struct HeuristicScreener {
    batch_size: usize,
}

impl HeuristicScreener {
    pub fn new(batch_size: usize) -> Self {
        Self { batch_size }
    }
}

#[async_trait]
impl Screener for HeuristicScreener {
    async fn screen(
        &self,
        documents: &[Document],
        criteria: &ScreeningCriteria,
    ) -> Result<ScreeningOutcome, SysrevError> {
        let engine = ScreeningEngine::new(self.batch_size)?;
        Ok(engine.screen(documents, criteria)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_formulator_builds_question_and_subquestions() {
        let question = HeuristicFormulator
            .formulate("quantum error correction", &HashMap::new())
            .await
            .unwrap();
        assert!(question.main_question.contains("quantum error correction"));
        assert_eq!(question.sub_questions.len(), 3);
        assert_eq!(
            question.context.get("field"),
            Some(&serde_json::Value::String("quantum error correction".into()))
        );
        assert!(!question.user_approved);
    }

    #[tokio::test]
    async fn test_formulator_rejects_empty_idea() {
        let err = HeuristicFormulator
            .formulate("   ", &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Failed { stage: "formulator", .. }));
    }

    #[tokio::test]
    async fn test_analyzer_extracts_topic_keywords() {
        let question = HeuristicFormulator
            .formulate("quantum error correction", &HashMap::new())
            .await
            .unwrap();
        let strategy = HeuristicAnalyzer.analyze(&question).await.unwrap();
        assert!(strategy.keywords.contains(&"quantum".to_string()));
        assert!(strategy.keywords.contains(&"error".to_string()));
        assert!(strategy.keywords.contains(&"correction".to_string()));
        // template filler never becomes a keyword
        assert!(!strategy.keywords.contains(&"approaches".to_string()));
        assert!(!strategy.combinations.is_empty());
        assert!(strategy.combinations[0].contains(" AND "));
    }

    #[tokio::test]
    async fn test_analyzer_deduplicates_keywords() {
        let question = ResearchQuestion {
            main_question: "neural neural networks".into(),
            sub_questions: vec!["neural networks again".into()],
            context: HashMap::new(),
            validation_score: 1.0,
            user_approved: false,
        };
        let strategy = HeuristicAnalyzer.analyze(&question).await.unwrap();
        assert_eq!(
            strategy.keywords,
            vec!["neural".to_string(), "networks".to_string(), "again".to_string()]
        );
    }

    #[tokio::test]
    async fn test_screener_delegates_to_engine() {
        let docs = vec![
            Document::new("a", "Quantum title", "A quantum experiment."),
            Document::new("b", "Other title", "Unrelated content."),
        ];
        let criteria = ScreeningCriteria {
            required_keywords: vec!["quantum".into()],
            ..ScreeningCriteria::default()
        };
        let outcome = HeuristicScreener::new(10).screen(&docs, &criteria).await.unwrap();
        assert_eq!(outcome.total_processed(), 2);
        assert!(outcome.aborted.is_none());
    }
}
