//! Theme extraction: shared significant tokens across a batch.

use super::criteria::Theme;
use crate::types::Document;
use std::collections::BTreeSet;

/// Maximum number of themes returned per batch.
const MAX_THEMES: usize = 10;

/// Minimum token length to count as significant. Deliberately crude: no
/// stop-word list, just a length filter.
const MIN_TOKEN_LEN: usize = 5;

/// Extract up to ten themes from a batch of documents.
///
/// A token qualifies as a theme only when it appears in at least two
/// distinct documents. Frequency counts total occurrences across the
/// batch; confidence is `min(frequency / batch_len, 1.0)`.
pub fn extract(documents: &[Document]) -> Vec<Theme> {
    if documents.is_empty() {
        return Vec::new();
    }

    struct Accum {
        frequency: usize,
        document_ids: BTreeSet<String>,
        first_seen: usize,
    }

    let mut accum: std::collections::HashMap<String, Accum> = std::collections::HashMap::new();
    let mut order = 0usize;

    for document in documents {
        let text = format!("{} {}", document.title, document.abstract_text).to_lowercase();
        for token in text.split_whitespace() {
            if token.len() < MIN_TOKEN_LEN {
                continue;
            }
            let entry = accum.entry(token.to_string()).or_insert_with(|| {
                order += 1;
                Accum {
                    frequency: 0,
                    document_ids: BTreeSet::new(),
                    first_seen: order,
                }
            });
            entry.frequency += 1;
            entry.document_ids.insert(document.id.clone());
        }
    }

    let batch_len = documents.len();
    let mut themes: Vec<(usize, Theme)> = accum
        .into_iter()
        .filter(|(_, a)| a.document_ids.len() >= 2)
        .map(|(token, a)| {
            let theme = Theme {
                name: token.clone(),
                keywords: vec![token],
                frequency: a.frequency,
                document_ids: a.document_ids,
                confidence: (a.frequency as f32 / batch_len as f32).min(1.0),
            };
            (a.first_seen, theme)
        })
        .collect();

    // Frequency descending; first-appearance order breaks ties so output
    // stays deterministic across runs.
    themes.sort_by(|(ord_a, a), (ord_b, b)| {
        b.frequency.cmp(&a.frequency).then(ord_a.cmp(ord_b))
    });
    themes.truncate(MAX_THEMES);
    themes.into_iter().map(|(_, theme)| theme).collect()
}
