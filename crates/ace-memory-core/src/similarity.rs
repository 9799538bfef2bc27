//! Lexical similarity over case-folded whitespace tokens.

use std::collections::HashSet;

/// Distinct lowercase whitespace-separated tokens of `text`.
pub fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Jaccard similarity of two token sets; 0.0 when either is empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Word-set overlap of two texts in `[0, 1]`.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    jaccard(&token_set(a), &token_set(b))
}
