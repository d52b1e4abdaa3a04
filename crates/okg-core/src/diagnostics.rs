//! Non-fatal extraction warnings
//!
//! Stages never fail on bad input data. They record a warning, log it,
//! and continue with the remaining records.

use serde::{Deserialize, Serialize};

use crate::{Dimension, EntityKind, Level};

/// A non-fatal condition encountered while processing a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// A raw record was malformed and skipped
    SkippedRecord { index: usize, reason: String },

    /// A relationship endpoint could not be resolved to a known entity
    UnresolvedRelationship {
        source: String,
        label: String,
        target: String,
        missing: String,
    },

    /// A relationship pointed an entity at itself
    SelfLoopDropped { entity: String, label: String },

    /// A relationship had an empty label after trimming
    EmptyRelationLabel { source: String, target: String },

    /// A name was already taken by an entity of another kind
    KindConflict {
        name: String,
        existing: EntityKind,
        rejected: EntityKind,
    },

    /// A declared trait had an unknown dimension or level
    InvalidTrait {
        entity: String,
        dimension: String,
        level: String,
    },

    /// Two descriptors gave different levels for the same entity/dimension
    TraitConflict {
        entity: String,
        dimension: Dimension,
        kept: Level,
        discarded: Level,
    },
}

impl std::fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SkippedRecord { index, reason } => {
                write!(f, "skipped record #{index}: {reason}")
            }
            Self::UnresolvedRelationship {
                source,
                label,
                target,
                missing,
            } => write!(
                f,
                "dropped relationship {source} -[{label}]-> {target}: unknown entity {missing}"
            ),
            Self::SelfLoopDropped { entity, label } => {
                write!(f, "dropped self-loop {entity} -[{label}]-> {entity}")
            }
            Self::EmptyRelationLabel { source, target } => {
                write!(f, "dropped unlabelled relationship {source} -> {target}")
            }
            Self::KindConflict {
                name,
                existing,
                rejected,
            } => write!(
                f,
                "name {name} already used by a {existing}; {rejected} mention rejected"
            ),
            Self::InvalidTrait {
                entity,
                dimension,
                level,
            } => write!(f, "invalid trait for {entity}: {dimension}={level}"),
            Self::TraitConflict {
                entity,
                dimension,
                kept,
                discarded,
            } => write!(
                f,
                "trait conflict for {entity}/{dimension}: kept {kept}, discarded {discarded}"
            ),
        }
    }
}

/// Ordered collection of warnings produced by a stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    warnings: Vec<ExtractionWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it
    pub fn warn(&mut self, warning: ExtractionWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Append warnings from another stage (already logged)
    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn warnings(&self) -> &[ExtractionWarning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Count warnings matching a predicate
    pub fn count(&self, predicate: impl Fn(&ExtractionWarning) -> bool) -> usize {
        self.warnings.iter().filter(|w| predicate(w)).count()
    }
}

impl IntoIterator for Diagnostics {
    type Item = ExtractionWarning;
    type IntoIter = std::vec::IntoIter<ExtractionWarning>;

    fn into_iter(self) -> Self::IntoIter {
        self.warnings.into_iter()
    }
}
