//! Methodology classification by trigger-phrase voting.

use super::criteria::Methodology;

/// Trigger phrases per category, in declaration order. Order matters: ties
/// at the maximum count resolve to the first category listed here.
const TRIGGER_PHRASES: &[(Methodology, &[&str])] = &[
    (Methodology::Experimental, &["experiment", "trial", "measurement"]),
    (Methodology::Theoretical, &["theory", "framework", "model"]),
    (Methodology::Review, &["review", "survey", "overview"]),
    (Methodology::CaseStudy, &["case study", "case-study", "case analysis"]),
    (Methodology::Survey, &["survey", "questionnaire", "interview"]),
    (
        Methodology::MetaAnalysis,
        &["meta-analysis", "meta analysis", "systematic review"],
    ),
];

/// Classify the methodology of an abstract by counting trigger-phrase
/// occurrences per category and taking the maximum.
///
/// Matching is case-insensitive substring counting (not word-boundary).
/// Returns [`Methodology::Other`] when no phrase occurs at all.
pub fn classify(abstract_text: &str) -> Methodology {
    let lower = abstract_text.to_lowercase();

    let mut best = Methodology::Other;
    let mut best_count = 0usize;
    for (category, phrases) in TRIGGER_PHRASES {
        let count: usize = phrases.iter().map(|p| count_occurrences(&lower, p)).sum();
        if count > best_count {
            best = *category;
            best_count = count;
        }
    }
    best
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0;
    let mut rest = haystack;
    while let Some(pos) = rest.find(needle) {
        count += 1;
        rest = &rest[pos + needle.len()..];
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experimental_classification() {
        let text = "We ran a controlled experiment with repeated measurement of latency.";
        assert_eq!(classify(text), Methodology::Experimental);
    }

    #[test]
    fn test_no_triggers_is_other() {
        assert_eq!(classify("Nothing of note here."), Methodology::Other);
        assert_eq!(classify(""), Methodology::Other);
    }

    #[test]
    fn test_tie_breaks_to_declaration_order() {
        // One experimental trigger and one theoretical trigger: tie resolves
        // to Experimental, which is declared first.
        let text = "An experiment grounded in theory.";
        assert_eq!(classify(text), Methodology::Experimental);
    }

    #[test]
    fn test_substring_counting_not_word_boundary() {
        // "surveys" still counts for "survey".
        let text = "Several surveys and another survey overview.";
        assert_eq!(classify(text), Methodology::Review);
    }

    #[test]
    fn test_determinism() {
        let text = "A systematic review and meta-analysis of trial data.";
        let first = classify(text);
        for _ in 0..10 {
            assert_eq!(classify(text), first);
        }
    }

    #[test]
    fn test_majority_vote_scenario() {
        // "experiment" twice vs "theory" once: Experimental wins 2 to 1.
        let text = "This experiment extends a prior experiment and one theory.";
        assert_eq!(classify(text), Methodology::Experimental);
    }

    #[test]
    fn test_count_occurrences() {
        assert_eq!(count_occurrences("abcabcab", "abc"), 2);
        assert_eq!(count_occurrences("aaaa", "aa"), 2);
        assert_eq!(count_occurrences("abc", ""), 0);
    }
}
