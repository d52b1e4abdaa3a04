//! Raw extraction records
//!
//! The shape produced by the extraction collaborator: one structured record
//! per character plus the paragraphs the characters appear in. Character
//! records stay as raw JSON values until the normalizer inspects them, so a
//! single malformed record never rejects the whole batch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{OkgError, Result};

/// A batch of records from one extraction run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    /// Character records (validated individually by the normalizer)
    #[serde(default)]
    pub characters: Vec<serde_json::Value>,

    /// Narrative paragraphs
    #[serde(default)]
    pub paragraphs: Vec<RawParagraph>,
}

impl ExtractionBatch {
    /// Parse a batch from the collaborator's JSON output
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| OkgError::ParseError(format!("extraction batch: {e}")))
    }

    /// Build a batch from typed character records
    pub fn from_records(characters: &[RawCharacter], paragraphs: Vec<RawParagraph>) -> Result<Self> {
        let characters = characters
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| OkgError::InvalidRecord(e.to_string()))?;

        Ok(Self {
            characters,
            paragraphs,
        })
    }
}

/// A single value or a list of values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        };
        items.iter().map(String::as_str)
    }
}

/// Structured character record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCharacter {
    /// Required; records without a name are skipped
    pub name: Option<String>,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub organization: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    /// dimension name -> level name
    #[serde(default)]
    pub base_traits: BTreeMap<String, String>,

    /// relation label -> target name(s)
    #[serde(default)]
    pub relationships: BTreeMap<String, OneOrMany>,
}

impl RawCharacter {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn with_organization(mut self, organization: &str) -> Self {
        self.organization = Some(organization.to_string());
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn with_trait(mut self, dimension: &str, level: &str) -> Self {
        self.base_traits
            .insert(dimension.to_string(), level.to_string());
        self
    }

    pub fn with_relationship(mut self, label: &str, targets: &[&str]) -> Self {
        let targets = match targets {
            [single] => OneOrMany::One(single.to_string()),
            many => OneOrMany::Many(many.iter().map(|t| t.to_string()).collect()),
        };
        self.relationships.insert(label.to_string(), targets);
        self
    }
}

/// A paragraph, either bare text or with an id and declared subjects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawParagraph {
    Text(String),
    Detailed {
        #[serde(default)]
        id: Option<String>,
        text: String,
        #[serde(default)]
        subjects: Vec<String>,
    },
}

impl RawParagraph {
    /// Paragraph id, defaulting to `p{index}`
    pub fn id(&self, index: usize) -> String {
        match self {
            Self::Detailed { id: Some(id), .. } => id.clone(),
            _ => format!("p{index}"),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Detailed { text, .. } => text,
        }
    }

    pub fn subjects(&self) -> &[String] {
        match self {
            Self::Text(_) => &[],
            Self::Detailed { subjects, .. } => subjects,
        }
    }
}

impl From<&str> for RawParagraph {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}
