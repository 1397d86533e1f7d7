//! Tokenizers for the two lexical models

use regex::Regex;
use std::sync::OnceLock;

/// Whitespace tokenization used by BM25 (case preserved)
pub fn whitespace_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Word tokenization used by TF-IDF: lower-cased runs of two or more word
/// characters. Single-character tokens are dropped.
pub fn word_tokens(text: &str) -> Vec<String> {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let re = WORD.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("static regex"));

    let lowered = text.to_lowercase();
    re.find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_tokens_keep_case_and_punctuation() {
        assert_eq!(
            whitespace_tokens("  Java,  backend\tEngineer\n"),
            vec!["Java,", "backend", "Engineer"]
        );
        assert!(whitespace_tokens("   ").is_empty());
    }

    #[test]
    fn test_word_tokens() {
        assert_eq!(
            word_tokens("C++ and Go; Rust-lang 5 years"),
            vec!["and", "go", "rust", "lang", "years"]
        );
    }
}
