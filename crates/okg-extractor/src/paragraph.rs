//! Paragraph trait attribution
//!
//! Runs the trait mapper over narrative paragraphs and attributes each match
//! to a known person. Attribution order for a match:
//! 1. nearest preceding mention in the same sentence
//! 2. nearest following mention in the same sentence
//! 3. most recent mention earlier in the paragraph
//! 4. the paragraph's sole declared subject
//!
//! Matches that resolve to nobody are dropped.

use std::collections::HashMap;
use std::ops::Range;

use okg_core::{match_key, Evidence, RawParagraph, TraitAssignment};
use tracing::trace;

use crate::mapper::{Polarity, Specificity, TraitMapper, TraitMatch};
use crate::token::TokenizedText;

/// A trait assignment before conflict resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitCandidate {
    pub assignment: TraitAssignment,
    pub specificity: Specificity,
    /// Lexicon surface that produced it
    pub surface: String,
}

/// A person mention found in a paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub person: String,
    pub tokens: Range<usize>,
    pub sentence: usize,
}

#[derive(Debug, Clone)]
struct NamePattern {
    words: Vec<String>,
    person: String,
}

/// Attributes paragraph trait matches to persons
#[derive(Debug)]
pub struct ParagraphScanner<'m> {
    mapper: &'m TraitMapper,
    /// Longest patterns first
    names: Vec<NamePattern>,
    /// match key -> canonical person id
    persons: HashMap<String, String>,
}

impl<'m> ParagraphScanner<'m> {
    /// `persons` are canonical person ids
    pub fn new<I, S>(mapper: &'m TraitMapper, persons: I, match_first_names: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokenizer = mapper.tokenizer();
        let mut known = HashMap::new();
        let mut names = Vec::new();

        for person in persons {
            let person = person.as_ref().to_string();
            let words = tokenizer.words(&person);
            if words.is_empty() || known.contains_key(&match_key(&person)) {
                continue;
            }
            known.insert(match_key(&person), person.clone());
            names.push(NamePattern { words, person });
        }

        if match_first_names {
            let mut first_counts: HashMap<&str, usize> = HashMap::new();
            for name in &names {
                *first_counts.entry(name.words[0].as_str()).or_default() += 1;
            }
            let first_names: Vec<NamePattern> = names
                .iter()
                .filter(|n| n.words.len() > 1 && first_counts[n.words[0].as_str()] == 1)
                .map(|n| NamePattern {
                    words: vec![n.words[0].clone()],
                    person: n.person.clone(),
                })
                .collect();
            names.extend(first_names);
        }

        names.sort_by(|a, b| b.words.len().cmp(&a.words.len()));

        Self {
            mapper,
            names,
            persons: known,
        }
    }

    /// Person mentions in order; overlapping candidates resolve to the longest
    pub fn mentions(&self, text: &TokenizedText) -> Vec<Mention> {
        let tokens = text.tokens();
        let mut mentions = Vec::new();
        let mut pos = 0;

        while pos < tokens.len() {
            let hit = self.names.iter().find(|name| {
                pos + name.words.len() <= tokens.len()
                    && name.words.iter().enumerate().all(|(k, word)| {
                        let token = &tokens[pos + k];
                        token.norm == *word && (k == 0 || token.adjacent)
                    })
            });

            match hit {
                Some(name) => {
                    let end = pos + name.words.len();
                    mentions.push(Mention {
                        person: name.person.clone(),
                        tokens: pos..end,
                        sentence: tokens[pos].sentence,
                    });
                    pos = end;
                }
                None => pos += 1,
            }
        }

        mentions
    }

    /// Trait candidates for one paragraph, produced lazily
    pub fn scan<'a>(
        &'a self,
        index: usize,
        paragraph: &'a RawParagraph,
    ) -> impl Iterator<Item = TraitCandidate> + 'a {
        let mapper: &'a TraitMapper = self.mapper;
        let text = mapper.tokenize(paragraph.text());
        let mentions = self.mentions(&text);
        let subject = self.sole_subject(paragraph.subjects());
        let id = paragraph.id(index);

        mapper
            .matches_in(text, Polarity::Neutral)
            .filter_map(move |m| {
                let Some(person) = attribute(&m, &mentions).or_else(|| subject.clone()) else {
                    trace!(paragraph = %id, surface = %m.surface, "no person for trait match");
                    return None;
                };

                let assignment = TraitAssignment::new(&person, m.dimension, m.level)
                    .with_evidence(Evidence::paragraph(id.clone(), m.snippet));
                Some(TraitCandidate {
                    assignment,
                    specificity: m.specificity,
                    surface: m.surface,
                })
            })
    }

    /// Candidates across all paragraphs, in paragraph order
    pub fn scan_all<'a>(
        &'a self,
        paragraphs: &'a [RawParagraph],
    ) -> impl Iterator<Item = TraitCandidate> + 'a {
        paragraphs
            .iter()
            .enumerate()
            .flat_map(move |(index, paragraph)| self.scan(index, paragraph))
    }

    fn sole_subject(&self, subjects: &[String]) -> Option<String> {
        match subjects {
            [only] => self.persons.get(&match_key(only)).cloned(),
            _ => None,
        }
    }
}

fn attribute(m: &TraitMatch, mentions: &[Mention]) -> Option<String> {
    let before = || mentions.iter().rev().filter(|x| x.tokens.end <= m.tokens.start);

    before()
        .find(|x| x.sentence == m.sentence)
        .or_else(|| {
            mentions
                .iter()
                .find(|x| x.tokens.start >= m.tokens.end && x.sentence == m.sentence)
        })
        .or_else(|| before().next())
        .map(|x| x.person.clone())
}
