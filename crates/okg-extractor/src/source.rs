//! Extraction sources
//!
//! `JsonSource` serves a collaborator response that is already on hand,
//! e.g. a cached LLM output or a test fixture.

use async_trait::async_trait;
use tracing::debug;

use okg_core::{ExtractionBatch, ExtractionSource, Result};

/// A JSON document in the `{characters, paragraphs}` shape
#[derive(Debug, Clone)]
pub struct JsonSource {
    name: String,
    payload: String,
}

impl JsonSource {
    pub fn new(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }
}

#[async_trait]
impl ExtractionSource for JsonSource {
    async fn fetch(&self) -> Result<ExtractionBatch> {
        let batch = ExtractionBatch::from_json(&self.payload)?;
        debug!(
            source = %self.name,
            characters = batch.characters.len(),
            paragraphs = batch.paragraphs.len(),
            "fetched extraction batch"
        );
        Ok(batch)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
