//! Trait Mapper
//!
//! Maps free-text descriptors onto the OCEAN taxonomy:
//! - Lexicon lookup: case-insensitive keyword match, every match emitted
//! - Qualifiers: the qualifier nearest the descriptor sets the intensity.
//!   On a high or low entry an intensifier keeps the pole and a diminisher
//!   softens it to medium. On a medium entry (the dimension nouns) they
//!   move one step up or down, so "low extraversion" reads as low
//! - Negation: a marker right before the qualifier chain (or descriptor)
//!   inverts the level, after the qualifier shift
//!
//! Matching is lazy; `TraitMatches` walks the tokens on demand and is
//! consumed once.

use std::collections::HashSet;
use std::ops::Range;

use okg_core::{Dimension, Level, MapperConfig, OkgError, Result};

use crate::lexicon::Lexicon;
use crate::token::{TokenizedText, Tokenizer};

// ============================================================================
// Match types
// ============================================================================

/// Caller supplied polarity cue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Polarity {
    #[default]
    Neutral,
    /// Negation known from context outside the descriptor
    Negated,
}

/// How specific a piece of evidence is; larger wins conflicts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    /// Tokens in the evidence span (negation + qualifiers + descriptor)
    pub tokens: usize,
    /// Byte length of the evidence span
    pub bytes: usize,
}

/// One lexicon hit with its resolved level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitMatch {
    pub dimension: Dimension,
    /// Level after qualifier and negation handling
    pub level: Level,
    /// Level as stored in the lexicon
    pub base_level: Level,
    pub negated: bool,
    /// Lexicon surface form that matched
    pub surface: String,
    /// Source text of the evidence span
    pub snippet: String,
    /// Byte span of the evidence in the source text
    pub span: Range<usize>,
    /// Token span of the descriptor itself
    pub tokens: Range<usize>,
    /// Sentence index of the descriptor
    pub sentence: usize,
    pub specificity: Specificity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shift {
    Intensify,
    Diminish,
}

impl Shift {
    fn apply(self, base: Level) -> Level {
        match (self, base) {
            (Shift::Intensify, Level::Medium) => base.shift_up(),
            (Shift::Diminish, Level::Medium) => base.shift_down(),
            (Shift::Intensify, pole) => pole,
            (Shift::Diminish, _) => Level::Medium,
        }
    }
}

#[derive(Debug, Clone)]
struct Pattern {
    words: Vec<String>,
    wildcard: bool,
    dimension: Dimension,
    level: Level,
    surface: String,
}

impl Pattern {
    fn matches_at(&self, text: &TokenizedText, pos: usize) -> bool {
        let tokens = text.tokens();
        if pos + self.words.len() > tokens.len() {
            return false;
        }

        let last = self.words.len() - 1;
        self.words.iter().enumerate().all(|(k, word)| {
            let token = &tokens[pos + k];
            if k > 0 && !token.adjacent {
                return false;
            }
            if k == last && self.wildcard {
                token.norm.starts_with(word.as_str())
            } else {
                token.norm == *word
            }
        })
    }
}

// ============================================================================
// Mapper
// ============================================================================

/// Lexicon based trait mapper
#[derive(Debug, Clone)]
pub struct TraitMapper {
    tokenizer: Tokenizer,
    patterns: Vec<Pattern>,
    negations: HashSet<String>,
    intensifiers: HashSet<String>,
    diminishers: HashSet<String>,
    qualifier_window: usize,
}

impl TraitMapper {
    /// Compile a lexicon with the given qualifier/negation vocabulary
    pub fn new(lexicon: &Lexicon, config: &MapperConfig) -> Result<Self> {
        let tokenizer = Tokenizer::new()?;

        let mut patterns = Vec::with_capacity(lexicon.len());
        for entry in lexicon.entries() {
            let wildcard = entry.is_wildcard();
            let words = tokenizer.words(entry.surface.trim_end_matches('*'));
            if words.is_empty() {
                return Err(OkgError::InvalidLexicon(format!(
                    "surface form {:?} has no words",
                    entry.surface
                )));
            }
            patterns.push(Pattern {
                words,
                wildcard,
                dimension: entry.dimension,
                level: entry.level,
                surface: entry.surface.clone(),
            });
        }

        let vocabulary = |list: &[String]| -> HashSet<String> {
            list.iter().map(|w| w.trim().to_lowercase()).collect()
        };

        Ok(Self {
            tokenizer,
            patterns,
            negations: vocabulary(&config.negation_markers),
            intensifiers: vocabulary(&config.intensifiers),
            diminishers: vocabulary(&config.diminishers),
            qualifier_window: config.qualifier_window,
        })
    }

    /// Built-in lexicon and default vocabulary
    pub fn builtin() -> Result<Self> {
        Self::new(&Lexicon::builtin()?, &MapperConfig::default())
    }

    /// Lexicon from `lexicon_path`, or the built-in one when unset
    pub fn from_config(config: &MapperConfig) -> Result<Self> {
        let lexicon = match &config.lexicon_path {
            Some(path) => Lexicon::from_file(path)?,
            None => Lexicon::builtin()?,
        };
        Self::new(&lexicon, config)
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn tokenize(&self, text: &str) -> TokenizedText {
        self.tokenizer.tokenize(text)
    }

    /// Scan text for lexicon matches
    pub fn matches(&self, text: &str) -> TraitMatches<'_> {
        self.matches_in(self.tokenize(text), Polarity::Neutral)
    }

    /// Scan already tokenized text
    pub fn matches_in(&self, text: TokenizedText, polarity: Polarity) -> TraitMatches<'_> {
        TraitMatches {
            mapper: self,
            text,
            polarity,
            pos: 0,
            pattern: 0,
        }
    }

    /// Map a bare descriptor ("not particularly organized") to readings
    pub fn describe(&self, descriptor: &str, polarity: Polarity) -> TraitMatches<'_> {
        self.matches_in(self.tokenize(descriptor), polarity)
    }

    fn shift_of(&self, word: &str) -> Option<Shift> {
        if self.intensifiers.contains(word) {
            Some(Shift::Intensify)
        } else if self.diminishers.contains(word) {
            Some(Shift::Diminish)
        } else {
            None
        }
    }

    fn resolve(
        &self,
        text: &TokenizedText,
        pattern: &Pattern,
        pos: usize,
        polarity: Polarity,
    ) -> TraitMatch {
        let tokens = text.tokens();
        let end = pos + pattern.words.len();

        // Qualifier chain immediately before the descriptor
        let mut chain_start = pos;
        let mut nearest: Option<Shift> = None;
        while chain_start > 0 && pos - chain_start < self.qualifier_window {
            if !tokens[chain_start].adjacent {
                break;
            }
            match self.shift_of(&tokens[chain_start - 1].norm) {
                Some(shift) => {
                    nearest.get_or_insert(shift);
                    chain_start -= 1;
                }
                None => break,
            }
        }

        let mut level = nearest.map_or(pattern.level, |shift| shift.apply(pattern.level));

        let negated_in_text = chain_start > 0
            && tokens[chain_start].adjacent
            && self.negations.contains(&tokens[chain_start - 1].norm);
        let negated = negated_in_text != (polarity == Polarity::Negated);
        if negated {
            level = level.inverted();
        }

        let span_start = if negated_in_text {
            chain_start - 1
        } else {
            chain_start
        };
        let span = tokens[span_start].start..tokens[end - 1].end;

        TraitMatch {
            dimension: pattern.dimension,
            level,
            base_level: pattern.level,
            negated,
            surface: pattern.surface.clone(),
            snippet: text.slice(span_start, end).to_string(),
            specificity: Specificity {
                tokens: end - span_start,
                bytes: span.end - span.start,
            },
            span,
            tokens: pos..end,
            sentence: tokens[pos].sentence,
        }
    }
}

/// Lazy, single-pass iterator over trait matches in one text
#[derive(Debug)]
pub struct TraitMatches<'m> {
    mapper: &'m TraitMapper,
    text: TokenizedText,
    polarity: Polarity,
    pos: usize,
    pattern: usize,
}

impl TraitMatches<'_> {
    /// The tokenized text being scanned
    pub fn text(&self) -> &TokenizedText {
        &self.text
    }
}

impl Iterator for TraitMatches<'_> {
    type Item = TraitMatch;

    fn next(&mut self) -> Option<Self::Item> {
        let patterns = &self.mapper.patterns;
        while self.pos < self.text.len() {
            while self.pattern < patterns.len() {
                let pattern = &patterns[self.pattern];
                self.pattern += 1;
                if pattern.matches_at(&self.text, self.pos) {
                    return Some(
                        self.mapper
                            .resolve(&self.text, pattern, self.pos, self.polarity),
                    );
                }
            }
            self.pos += 1;
            self.pattern = 0;
        }
        None
    }
}
