//! Text tokenization
//!
//! Turns raw page text into lowercase ASCII alphanumeric tokens. ASCII
//! punctuation and whitespace separate tokens; non-ASCII characters are
//! dropped outright, so `café` becomes `caf` rather than `cafe`.

use std::collections::HashMap;

/// Split `text` into normalized tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c.is_ascii() {
                Some(' ')
            } else {
                None
            }
        })
        .collect();

    normalized
        .split_whitespace()
        .filter(|word| word.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_string)
        .collect()
}

/// Count occurrences of each token.
pub fn word_frequencies<S: AsRef<str>>(tokens: &[S]) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_ref().to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokenize() {
        let tokens = tokenize("Hello, World! It's 2024.");
        assert_eq!(tokens, vec!["hello", "world", "it", "s", "2024"]);
    }

    #[test]
    fn test_non_ascii_dropped_not_split() {
        assert_eq!(tokenize("café naïve"), vec!["caf", "nave"]);
        assert_eq!(tokenize("日本語"), Vec::<String>::new());
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \n\t ...  ").is_empty());
    }

    #[test]
    fn test_retokenize_is_fixed_point() {
        let text = "The Quick-brown fox; jumps over\tthe lazy dog #42 — ünïcode";
        let first = tokenize(text);
        let second = tokenize(&first.join(" "));
        assert_eq!(first, second);
    }

    #[test]
    fn test_word_frequencies() {
        let tokens = tokenize("a b a c a b");
        let freqs = word_frequencies(tokens.as_slice());
        assert_eq!(freqs["a"], 3);
        assert_eq!(freqs["b"], 2);
        assert_eq!(freqs["c"], 1);
    }
}
