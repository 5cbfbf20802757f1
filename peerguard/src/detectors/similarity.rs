// peerguard/src/detectors/similarity.rs
//
// Token-set (Jaccard) similarity between two short texts, e.g. titles.
//
// Normalization, in order:
//   1. lowercase
//   2. every non-alphanumeric character becomes a separator
//   3. split on whitespace and drop English stop words
//   4. if only stop words remain, fall back to the unfiltered token set
//
// A text with no alphanumeric token has an empty set and scores 0.0 against
// anything, itself included. Otherwise similarity(a, a) == 1.0.

use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "into", "is", "it",
    "of", "on", "or", "that", "the", "to", "via", "with",
];

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}

/// The token set a text is compared by.
pub fn token_set(text: &str) -> HashSet<String> {
    let normalized = normalize_text(text);
    let all: Vec<&str> = normalized.split_whitespace().collect();
    let content: HashSet<String> = all
        .iter()
        .filter(|t| !STOP_WORDS.contains(t))
        .map(|t| t.to_string())
        .collect();
    if content.is_empty() {
        all.into_iter().map(str::to_string).collect()
    } else {
        content
    }
}

/// Jaccard similarity of two pre-computed token sets.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    inter as f64 / union as f64
}

/// Similarity in [0, 1]. Deterministic and symmetric.
pub fn similarity(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_strings_score_zero() {
        assert_eq!(similarity("", ""), 0.0);
        assert_eq!(similarity("", "deep learning"), 0.0);
        assert_eq!(similarity("deep learning", ""), 0.0);
        assert_eq!(similarity("?!", "?!"), 0.0);
    }

    #[test]
    fn identical_text_scores_one() {
        assert_eq!(similarity("Graph Neural Networks", "Graph Neural Networks"), 1.0);
        assert_eq!(similarity("the of", "the of"), 1.0);
    }

    #[test]
    fn case_punctuation_and_stop_words_ignored() {
        assert_eq!(
            similarity("A Survey of Graph-Neural Networks", "survey: graph neural networks"),
            1.0
        );
    }

    #[test]
    fn partial_overlap() {
        // {deep, learning, protein, folding} vs {deep, learning, weather}
        let s = similarity("Deep Learning for Protein Folding", "Deep Learning for Weather");
        assert!((s - 2.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_texts_score_zero() {
        assert_eq!(similarity("quantum chemistry", "medieval poetry"), 0.0);
    }

    proptest! {
        #[test]
        fn symmetric(a in "[A-Za-z ,.]{0,40}", b in "[A-Za-z ,.]{0,40}") {
            prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
        }

        #[test]
        fn bounded(a in "\\PC{0,40}", b in "\\PC{0,40}") {
            let s = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn reflexive_for_nonempty(a in "[a-z]{1,8}( [a-z]{1,8}){0,5}") {
            prop_assert_eq!(similarity(&a, &a), 1.0);
        }
    }
}
