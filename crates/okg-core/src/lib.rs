//! OKG Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the OKG system:
//! - Personality taxonomy (OCEAN dimensions and qualitative levels)
//! - Knowledge graph models (entities, relationships, trait assignments)
//! - Raw extraction records handed over by the extraction collaborator
//! - Common error types and non-fatal extraction warnings
//! - Configuration management

pub mod config;
pub mod diagnostics;
pub mod record;

pub use config::{
    AppConfig, ConfigError, EnvOverrides, EvaluationConfig, LoggingConfig, MapperConfig,
};
pub use diagnostics::{Diagnostics, ExtractionWarning};
pub use record::{ExtractionBatch, OneOrMany, RawCharacter, RawParagraph};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for OKG operations
#[derive(Error, Debug)]
pub enum OkgError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid lexicon: {0}")]
    InvalidLexicon(String),

    #[error("Dangling edge {source_id} -[{label}]-> {target_id}: missing node {missing}")]
    DanglingEdge {
        source_id: String,
        target_id: String,
        label: String,
        missing: String,
    },

    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    #[error("Self-loop on {entity} with label {label}")]
    SelfLoop { entity: String, label: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Extraction source error: {0}")]
    ExtractionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, OkgError>;

// ============================================================================
// Name canonicalization
// ============================================================================

/// Trim and collapse internal whitespace, keeping the original casing.
pub fn canonical_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-folded canonical form used for matching only.
pub fn match_key(raw: &str) -> String {
    canonical_name(raw).to_lowercase()
}

// ============================================================================
// Personality Taxonomy
// ============================================================================

/// The five OCEAN personality dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl Dimension {
    /// All dimensions in canonical order
    pub const ALL: [Dimension; 5] = [
        Self::Openness,
        Self::Conscientiousness,
        Self::Extraversion,
        Self::Agreeableness,
        Self::Neuroticism,
    ];

    /// Lowercase identifier (used in node ids and lexicon files)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openness => "openness",
            Self::Conscientiousness => "conscientiousness",
            Self::Extraversion => "extraversion",
            Self::Agreeableness => "agreeableness",
            Self::Neuroticism => "neuroticism",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Openness => "Openness",
            Self::Conscientiousness => "Conscientiousness",
            Self::Extraversion => "Extraversion",
            Self::Agreeableness => "Agreeableness",
            Self::Neuroticism => "Neuroticism",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Dimension {
    type Err = OkgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openness" => Ok(Self::Openness),
            "conscientiousness" => Ok(Self::Conscientiousness),
            "extraversion" | "extroversion" => Ok(Self::Extraversion),
            "agreeableness" => Ok(Self::Agreeableness),
            "neuroticism" => Ok(Self::Neuroticism),
            other => Err(OkgError::ParseError(format!("unknown dimension: {other}"))),
        }
    }
}

/// Qualitative level on the ordered scale low < medium < high
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// One step up, clamped at `High`
    pub fn shift_up(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    /// One step down, clamped at `Low`
    pub fn shift_down(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }

    /// Swap high and low; medium is unaffected
    pub fn inverted(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::Medium => Self::Medium,
            Self::High => Self::Low,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Level {
    type Err = OkgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "moderate" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(OkgError::ParseError(format!("unknown level: {other}"))),
        }
    }
}

/// Which interpretation of a trait match the evaluator applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Same entity, dimension and level
    #[default]
    Exact,
    /// Same entity and dimension; level ignored
    Retrieval,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Retrieval => write!(f, "retrieval"),
        }
    }
}

impl std::str::FromStr for MatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "retrieval" => Ok(Self::Retrieval),
            _ => Err(ConfigError::InvalidValue {
                key: "OKG_MATCH_MODE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Knowledge Graph Entities
// ============================================================================

/// Kind of a named entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Organization,
    Location,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::Person, Self::Organization, Self::Location];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Location => "location",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A person, organization or location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical display name; also the node id
    pub id: String,

    /// Entity kind
    pub kind: EntityKind,

    /// Free-form attributes (e.g. role)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Entity {
    /// Create a new entity; the id is canonicalized
    pub fn new(name: &str, kind: EntityKind) -> Self {
        Self {
            id: canonical_name(name),
            kind,
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute value
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Case-folded key used for deduplication
    pub fn key(&self) -> String {
        match_key(&self.id)
    }
}

/// Where a relationship or trait assignment came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Evidence {
    /// A structured character record (by position in the batch)
    Record { index: usize },
    /// A text span inside a paragraph
    Paragraph { id: String, snippet: String },
}

impl Evidence {
    pub fn record(index: usize) -> Self {
        Self::Record { index }
    }

    pub fn paragraph(id: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self::Paragraph {
            id: id.into(),
            snippet: snippet.into(),
        }
    }
}

/// A directed, labelled relationship between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source entity id
    pub source: String,

    /// Target entity id
    pub target: String,

    /// Relation label (lower-case, e.g. "manages")
    pub label: String,

    /// Optional provenance
    pub evidence: Option<Evidence>,
}

impl Relationship {
    pub fn new(source: &str, label: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            label: label.to_string(),
            evidence: None,
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = Some(evidence);
        self
    }
}

/// A personality dimension/level attributed to an entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitAssignment {
    /// Entity id the trait belongs to
    pub entity: String,

    pub dimension: Dimension,

    pub level: Level,

    /// Optional supporting text
    #[serde(default)]
    pub evidence: Option<Evidence>,
}

impl TraitAssignment {
    pub fn new(entity: &str, dimension: Dimension, level: Level) -> Self {
        Self {
            entity: canonical_name(entity),
            dimension,
            level,
            evidence: None,
        }
    }

    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence = Some(evidence);
        self
    }

    /// Node id of this assignment in the knowledge graph
    pub fn node_id(&self) -> String {
        format!("{}::{}", self.entity, self.dimension)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// External collaborator that produces structured extraction records
/// (typically an LLM chain returning JSON).
#[async_trait::async_trait]
pub trait ExtractionSource: Send + Sync {
    /// Fetch the batch of records to process
    async fn fetch(&self) -> Result<ExtractionBatch>;

    /// Source name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
