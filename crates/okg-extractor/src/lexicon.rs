//! Trait lexicon
//!
//! Injectable configuration data associating surface forms with an OCEAN
//! dimension and a base level. The mapper compiles it; nothing here knows
//! how matching works.

use std::collections::BTreeMap;
use std::path::Path;

use okg_core::{Dimension, Level, OkgError, Result};

const BUILTIN_LEXICON: &str = include_str!("lexicon/default.toml");

/// On-disk shape: `[dimension] level = ["surface", ...]`
type LexiconFile = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// A single surface form and what it implies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexiconEntry {
    /// Lower-cased surface form; a trailing `*` is a prefix wildcard
    pub surface: String,
    pub dimension: Dimension,
    pub level: Level,
}

impl LexiconEntry {
    pub fn new(surface: &str, dimension: Dimension, level: Level) -> Result<Self> {
        let surface = surface.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        if surface.trim_end_matches('*').is_empty() {
            return Err(OkgError::InvalidLexicon(format!(
                "empty surface form for {dimension}/{level}"
            )));
        }
        Ok(Self {
            surface,
            dimension,
            level,
        })
    }

    pub fn is_wildcard(&self) -> bool {
        self.surface.ends_with('*')
    }
}

/// Collection of lexicon entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
    entries: Vec<LexiconEntry>,
}

impl Lexicon {
    /// Empty lexicon
    pub fn new() -> Self {
        Self::default()
    }

    /// Lexicon shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_LEXICON)
    }

    /// Parse a TOML lexicon document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: LexiconFile =
            toml::from_str(content).map_err(|e| OkgError::InvalidLexicon(e.to_string()))?;

        let mut lexicon = Self::new();
        for (dimension, levels) in file {
            let dimension: Dimension = dimension
                .parse()
                .map_err(|e: OkgError| OkgError::InvalidLexicon(e.to_string()))?;
            for (level, surfaces) in levels {
                let level: Level = level
                    .parse()
                    .map_err(|e: OkgError| OkgError::InvalidLexicon(e.to_string()))?;
                for surface in surfaces {
                    lexicon.push(LexiconEntry::new(&surface, dimension, level)?);
                }
            }
        }
        Ok(lexicon)
    }

    /// Load a TOML lexicon file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            OkgError::InvalidLexicon(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Add an entry (builder style)
    pub fn with_entry(mut self, surface: &str, dimension: Dimension, level: Level) -> Result<Self> {
        self.push(LexiconEntry::new(surface, dimension, level)?);
        Ok(self)
    }

    /// Add an entry, ignoring exact duplicates
    pub fn push(&mut self, entry: LexiconEntry) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    /// Merge another lexicon into this one
    pub fn extend(&mut self, other: Lexicon) {
        for entry in other.entries {
            self.push(entry);
        }
    }

    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries for one dimension
    pub fn for_dimension(&self, dimension: Dimension) -> impl Iterator<Item = &LexiconEntry> {
        self.entries.iter().filter(move |e| e.dimension == dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_all_dimensions() {
        let lexicon = Lexicon::builtin().unwrap();

        for dimension in Dimension::ALL {
            assert!(
                lexicon.for_dimension(dimension).count() > 3,
                "{dimension} has too few entries"
            );
        }
    }

    #[test]
    fn test_builtin_dimension_nouns_are_medium() {
        let lexicon = Lexicon::builtin().unwrap();

        for dimension in Dimension::ALL {
            let noun = lexicon
                .entries()
                .iter()
                .find(|e| e.surface == dimension.as_str())
                .unwrap();
            assert_eq!(noun.level, Level::Medium);
            assert_eq!(noun.dimension, dimension);
        }
    }

    #[test]
    fn test_builtin_organized_is_conscientiousness_high() {
        let lexicon = Lexicon::builtin().unwrap();
        let entry = lexicon
            .entries()
            .iter()
            .find(|e| e.surface == "organized")
            .unwrap();

        assert_eq!(entry.dimension, Dimension::Conscientiousness);
        assert_eq!(entry.level, Level::High);
    }

    #[test]
    fn test_from_toml_str() {
        let lexicon = Lexicon::from_toml_str(
            r#"
            [openness]
            high = ["Curious", "big  picture*"]

            [neuroticism]
            low = ["calm"]
            "#,
        )
        .unwrap();

        assert_eq!(lexicon.len(), 3);
        assert!(lexicon.entries().iter().any(|e| e.surface == "curious"));
        let wildcard = lexicon
            .entries()
            .iter()
            .find(|e| e.surface == "big picture*")
            .unwrap();
        assert!(wildcard.is_wildcard());
    }

    #[test]
    fn test_rejects_unknown_dimension() {
        let result = Lexicon::from_toml_str("[charisma]\nhigh = [\"magnetic\"]");
        assert!(matches!(result, Err(OkgError::InvalidLexicon(_))));
    }

    #[test]
    fn test_rejects_empty_surface() {
        let result = Lexicon::new().with_entry("  * ", Dimension::Openness, Level::High);
        assert!(result.is_err());
    }

    #[test]
    fn test_push_ignores_duplicates() {
        let lexicon = Lexicon::new()
            .with_entry("calm", Dimension::Neuroticism, Level::Low)
            .unwrap()
            .with_entry("Calm", Dimension::Neuroticism, Level::Low)
            .unwrap();
        assert_eq!(lexicon.len(), 1);
    }
}
