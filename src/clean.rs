//! Body-text cleaning to shrink prompt size.
//!
//! Lowercases, strips punctuation, and drops English stopwords before the
//! text is rendered into a prompt. Cleaning is lossy by design; the raw body
//! is always kept alongside the cleaned derivation.

/// Common English stopwords, matching the usual NLP stoplists.
const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "can't", "cannot", "could", "couldn't", "did", "didn't", "do", "does",
    "doesn't", "doing", "don't", "down", "during", "each", "few", "for", "from", "further", "had",
    "hadn't", "has", "hasn't", "have", "haven't", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "i'm", "i've", "if", "in", "into", "is", "isn't", "it",
    "it's", "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not",
    "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "same", "she", "should", "shouldn't", "so", "some", "such", "than", "that",
    "that's", "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
    "they're", "this", "those", "through", "to", "too", "under", "until", "up", "very", "was",
    "wasn't", "we", "we're", "were", "weren't", "what", "when", "where", "which", "while", "who",
    "whom", "why", "will", "with", "won't", "would", "wouldn't", "you", "you're", "your", "yours",
    "yourself", "yourselves",
];

/// Clean and normalize text: lowercase, strip punctuation, remove stopwords.
///
/// Empty input yields an empty string, never an error.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|token| !token.is_empty())
        .filter(|token| !STOPWORDS.contains(token))
        .collect();

    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_lowercases_and_drops_stopwords() {
        let cleaned = clean_text("The Quick Brown Fox is jumping over the lazy dog");
        assert_eq!(cleaned, "quick brown fox jumping lazy dog");
    }

    #[test]
    fn test_strips_punctuation() {
        let cleaned = clean_text("Hello, world! (Really?)");
        assert_eq!(cleaned, "hello world really");
    }

    #[test]
    fn test_pure_punctuation_tokens_dropped() {
        assert_eq!(clean_text("--- !!! rust ---"), "rust");
    }
}
