//! Word tokenization shared by the lexicon, the mapper and name mentions.

use regex::Regex;

use okg_core::Result;

const WORD_PATTERN: &str = r"[\p{L}\p{N}]+(?:['’\-][\p{L}\p{N}]+)*";
const SENTENCE_END_PATTERN: &str = r"[.!?]+(?:\s+|$)";

/// A word token with its byte span in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lower-cased form with possessive `'s` removed
    pub norm: String,
    pub start: usize,
    pub end: usize,
    /// Sentence index within the text
    pub sentence: usize,
    /// Only whitespace separates this token from the previous one
    pub adjacent: bool,
}

/// Text split into tokens; owns its source so iterators can carry it
#[derive(Debug, Clone)]
pub struct TokenizedText {
    text: String,
    tokens: Vec<Token>,
}

impl TokenizedText {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Source text covered by tokens `from..to`
    pub fn slice(&self, from: usize, to: usize) -> &str {
        match (self.tokens.get(from), to.checked_sub(1).and_then(|i| self.tokens.get(i))) {
            (Some(first), Some(last)) if first.start <= last.end => &self.text[first.start..last.end],
            _ => "",
        }
    }
}

/// Regex based word tokenizer
#[derive(Debug, Clone)]
pub struct Tokenizer {
    word: Regex,
    sentence_end: Regex,
}

impl Tokenizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            word: Regex::new(WORD_PATTERN).map_err(anyhow::Error::from)?,
            sentence_end: Regex::new(SENTENCE_END_PATTERN).map_err(anyhow::Error::from)?,
        })
    }

    /// Normalized word forms only
    pub fn words(&self, text: &str) -> Vec<String> {
        self.word
            .find_iter(text)
            .map(|m| normalize_word(m.as_str()))
            .collect()
    }

    pub fn tokenize(&self, text: &str) -> TokenizedText {
        let boundaries: Vec<usize> = self.sentence_end.find_iter(text).map(|m| m.end()).collect();

        let mut tokens: Vec<Token> = Vec::new();
        let mut sentence = 0;
        for m in self.word.find_iter(text) {
            while sentence < boundaries.len() && boundaries[sentence] <= m.start() {
                sentence += 1;
            }
            let adjacent = tokens
                .last()
                .map(|prev| text[prev.end..m.start()].chars().all(char::is_whitespace))
                .unwrap_or(false);

            tokens.push(Token {
                norm: normalize_word(m.as_str()),
                start: m.start(),
                end: m.end(),
                sentence,
                adjacent,
            });
        }

        TokenizedText {
            text: text.to_string(),
            tokens,
        }
    }
}

fn normalize_word(word: &str) -> String {
    let lower = word.to_lowercase().replace('’', "'");
    match lower.strip_suffix("'s") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_possessive_and_hyphen() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = tokenizer.tokenize("Maria's open-minded approach wasn't rigid");

        let norms: Vec<_> = text.tokens().iter().map(|t| t.norm.as_str()).collect();
        assert_eq!(norms, vec!["maria", "open-minded", "approach", "wasn't", "rigid"]);
    }

    #[test]
    fn test_sentence_indices() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = tokenizer.tokenize("Sarah led. Her team followed! Done");

        let sentences: Vec<_> = text.tokens().iter().map(|t| t.sentence).collect();
        assert_eq!(sentences, vec![0, 0, 1, 1, 1, 2]);
    }

    #[test]
    fn test_adjacency_breaks_on_punctuation() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = tokenizer.tokenize("not, organized");

        assert!(!text.tokens()[0].adjacent);
        assert!(!text.tokens()[1].adjacent);

        let text = tokenizer.tokenize("not  organized");
        assert!(text.tokens()[1].adjacent);
    }

    #[test]
    fn test_slice() {
        let tokenizer = Tokenizer::new().unwrap();
        let text = tokenizer.tokenize("displayed remarkable conscientiousness today");

        assert_eq!(text.slice(1, 3), "remarkable conscientiousness");
        assert_eq!(text.slice(3, 3), "");
    }
}
