//! Relevance scoring: additive point system bucketed into tiers.

use super::criteria::{Methodology, RelevanceTier, ScreeningCriteria};
use super::methodology;
use crate::error::ScreeningError;
use crate::types::Document;

/// The scored verdict for one document, before batch ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceVerdict {
    pub tier: RelevanceTier,
    pub methodology: Methodology,
    pub inclusion_reasons: Vec<String>,
    pub exclusion_reasons: Vec<String>,
}

/// Score a document against screening criteria.
///
/// Point system:
/// - `(required keywords found / required keyword count) * 2.0`, where an
///   empty required list counts as a full match (ratio 1.0);
/// - `-1.0` per excluded keyword found;
/// - `+1.0` if the classified methodology is in `criteria.methodology_types`.
///
/// Matching is case-insensitive substring over title-or-abstract. The point
/// total is bucketed by [`RelevanceTier::from_points`] and then discarded;
/// callers derive the stored float from the tier.
///
/// Fails with `MissingField` when the document has an empty title or
/// abstract; batch policy (skip vs. abort) is the caller's decision.
pub fn score(
    document: &Document,
    criteria: &ScreeningCriteria,
) -> Result<RelevanceVerdict, ScreeningError> {
    let title = document.require_title()?.to_lowercase();
    let abstract_text = document.require_abstract()?.to_lowercase();

    let mut points = 0.0f32;
    let mut inclusion_reasons = Vec::new();
    let mut exclusion_reasons = Vec::new();

    let contains = |keyword: &str| {
        let kw = keyword.to_lowercase();
        title.contains(&kw) || abstract_text.contains(&kw)
    };

    let required_ratio = if criteria.required_keywords.is_empty() {
        1.0
    } else {
        let mut found = 0usize;
        for keyword in &criteria.required_keywords {
            if contains(keyword) {
                found += 1;
                inclusion_reasons.push(format!("matched required keyword '{keyword}'"));
            }
        }
        found as f32 / criteria.required_keywords.len() as f32
    };
    points += required_ratio * 2.0;

    for keyword in &criteria.excluded_keywords {
        if contains(keyword) {
            points -= 1.0;
            exclusion_reasons.push(format!("matched excluded keyword '{keyword}'"));
        }
    }

    let methodology = methodology::classify(&document.abstract_text);
    if criteria.methodology_types.contains(&methodology) {
        points += 1.0;
        inclusion_reasons.push(format!("methodology match: {methodology}"));
    }

    Ok(RelevanceVerdict {
        tier: RelevanceTier::from_points(points),
        methodology,
        inclusion_reasons,
        exclusion_reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn criteria(required: &[&str], excluded: &[&str], methods: &[Methodology]) -> ScreeningCriteria {
        ScreeningCriteria {
            required_keywords: required.iter().map(|s| s.to_string()).collect(),
            excluded_keywords: excluded.iter().map(|s| s.to_string()).collect(),
            methodology_types: methods.iter().copied().collect::<BTreeSet<_>>(),
            ..ScreeningCriteria::default()
        }
    }

    #[test]
    fn test_full_match_is_high() {
        // Both required keywords + methodology match: 2.0 + 1.0 = 3.0 → High.
        let doc = Document::new(
            "d1",
            "Quantum advances",
            "We describe a quantum experiment applying ai methods.",
        );
        let crit = criteria(&["quantum", "ai"], &[], &[Methodology::Experimental]);
        let verdict = score(&doc, &crit).unwrap();
        assert_eq!(verdict.tier, RelevanceTier::High);
        assert_eq!(verdict.methodology, Methodology::Experimental);
        assert_eq!(verdict.inclusion_reasons.len(), 3);
    }

    #[test]
    fn test_empty_required_keywords_vacuous_match() {
        // No required keywords: ratio is 1.0 → 2.0 points → Medium.
        let doc = Document::new("d2", "Anything", "Plain text with no triggers.");
        let verdict = score(&doc, &criteria(&[], &[], &[])).unwrap();
        assert_eq!(verdict.tier, RelevanceTier::Medium);
    }

    #[test]
    fn test_excluded_keywords_penalize() {
        // 2.0 (vacuous) - 2 exclusions = 0.0 → Irrelevant.
        let doc = Document::new("d3", "Legacy blockchain", "A blockchain retrospective.");
        let verdict = score(&doc, &criteria(&[], &["blockchain", "legacy"], &[])).unwrap();
        assert_eq!(verdict.tier, RelevanceTier::Irrelevant);
        assert_eq!(verdict.exclusion_reasons.len(), 2);
    }

    #[test]
    fn test_title_match_counts() {
        let doc = Document::new("d4", "A quantum study", "No keywords in the body.");
        let crit = criteria(&["quantum"], &[], &[]);
        let verdict = score(&doc, &crit).unwrap();
        // Full ratio from title alone: 2.0 → Medium.
        assert_eq!(verdict.tier, RelevanceTier::Medium);
    }

    #[test]
    fn test_missing_abstract_fails() {
        let doc = Document::new("d5", "Title", "");
        let err = score(&doc, &ScreeningCriteria::default()).unwrap_err();
        assert!(matches!(err, ScreeningError::MissingField { field: "abstract", .. }));
    }

    #[test]
    fn test_case_insensitive_matching() {
        let doc = Document::new("d6", "QUANTUM Computing", "AI everywhere.");
        let crit = criteria(&["Quantum", "ai"], &[], &[]);
        let verdict = score(&doc, &crit).unwrap();
        assert_eq!(verdict.tier, RelevanceTier::Medium);
    }

    proptest! {
        /// Adding excluded-keyword matches never raises the tier.
        #[test]
        fn prop_exclusions_monotonically_decrease(extra in 0usize..4) {
            let doc = Document::new(
                "p1",
                "quantum ai research",
                "quantum ai experiment with measurement noise",
            );
            let exclusions = ["noise", "measurement", "research", "quantum"];
            let base = score(&doc, &criteria(&["quantum", "ai"], &[], &[])).unwrap();
            let crit = criteria(&["quantum", "ai"], &exclusions[..extra], &[]);
            let penalized = score(&doc, &crit).unwrap();
            prop_assert!(penalized.tier <= base.tier);
        }

        /// Scoring is deterministic for arbitrary abstracts.
        #[test]
        fn prop_deterministic(text in "[a-z ]{0,80}") {
            let doc = Document::new("p2", "title", format!("x{text}"));
            let crit = criteria(&["quantum"], &["legacy"], &[Methodology::Review]);
            let a = score(&doc, &crit).unwrap();
            let b = score(&doc, &crit).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
