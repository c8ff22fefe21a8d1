//! Approximate string matching for typo suggestions
//!
//! Scores range from 0 (nothing in common) to 100 (identical after
//! normalization). Both strings are lowercased and stripped of punctuation
//! before comparison, then scored with the normalized Levenshtein
//! similarity.
//!
//! ```
//! use ehrkit_analysis::fuzzy::{best_match, similarity};
//!
//! assert_eq!(similarity("Diabets", "Diabetes"), 88);
//! assert_eq!(similarity("COPD", "copd."), 100);
//!
//! let choices = ["Fever", "Diabetes", "Cough"];
//! assert_eq!(best_match("diabetis", choices, 50), Some(("Diabetes", 88)));
//! assert_eq!(best_match("xyz", choices, 50), None);
//! ```

/// Minimum score for a suggestion to be offered.
pub const DEFAULT_SCORE_CUTOFF: u8 = 50;

/// Similarity score of two strings, 0 to 100.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn similarity(a: &str, b: &str) -> u8 {
    let a = normalize(a);
    let b = normalize(b);
    let score = strsim::normalized_levenshtein(&a, &b) * 100.0;
    score.round().clamp(0.0, 100.0) as u8
}

/// The choice most similar to `query` with a score of at least `cutoff`.
///
/// Ties are resolved in favor of the earliest choice.
pub fn best_match<'a, I>(query: &str, choices: I, cutoff: u8) -> Option<(&'a str, u8)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&str, u8)> = None;
    for choice in choices {
        let score = similarity(query, choice);
        if score >= cutoff && best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((choice, score));
        }
    }
    best
}

fn normalize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("Fever", "fever"), 100);
        assert_eq!(similarity("abc", "xyz"), 0);
        assert_eq!(similarity("", ""), 100);
    }

    #[test]
    fn test_best_match_prefers_first_on_tie() {
        let choices = ["feverr", "feverx"];
        assert_eq!(best_match("fever", choices, 50), Some(("feverr", 83)));
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        // "ab" vs "ax": one edit out of two
        assert_eq!(similarity("ab", "ax"), 50);
        assert_eq!(best_match("ab", ["ax"], 50), Some(("ax", 50)));
        assert_eq!(best_match("ab", ["ax"], 51), None);
    }
}
