//! OKG Pipeline - extraction to graph to evaluation
//!
//! Runs the explicit stage sequence over one extraction batch:
//! - normalize character records into entities and relationships
//! - map paragraph text to OCEAN traits and resolve conflicts
//! - build the typed knowledge graph
//! - score predicted traits against ground truth
//!
//! Author: hephaex@gmail.com

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use okg_core::{
    AppConfig, Diagnostics, ExtractionBatch, ExtractionSource, OkgError, Result,
    TraitAssignment,
};
use okg_extractor::{EvaluationSet, NormalizedSet, TraitMapper};
use okg_graph::{GraphExport, GraphStats, KnowledgeGraph};

pub mod stages;
pub mod telemetry;

pub use telemetry::init_tracing;

/// Identity of a single pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl RunInfo {
    fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run: RunInfo,
    pub graph: KnowledgeGraph,
    pub normalized: NormalizedSet,
    /// Resolved paragraph-derived traits (the predictions)
    pub traits: Vec<TraitAssignment>,
    /// Ground truth the predictions were scored against
    pub ground_truth: Vec<TraitAssignment>,
    pub evaluation: EvaluationSet,
    /// Non-fatal warnings from every stage, in stage order
    pub diagnostics: Diagnostics,
}

impl PipelineOutput {
    /// Graph summary followed by the evaluation report(s)
    pub fn report(&self) -> String {
        let mut out = self.graph.summary();
        out.push('\n');
        out.push_str(&self.evaluation.reference.report());
        if let Some(retrieval) = &self.evaluation.retrieval {
            out.push('\n');
            out.push_str(&retrieval.report());
        }
        out
    }

    /// Machine-readable run summary: graph export, stats, traits and scores
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let summary = RunSummary {
            run: &self.run,
            stats: self.graph.stats(),
            graph: self.graph.export(),
            traits: &self.traits,
            evaluation: &self.evaluation,
            diagnostics: &self.diagnostics,
        };
        serde_json::to_value(summary).map_err(|e| OkgError::Other(e.into()))
    }
}

#[derive(Serialize)]
struct RunSummary<'a> {
    run: &'a RunInfo,
    stats: GraphStats,
    graph: GraphExport,
    traits: &'a [TraitAssignment],
    evaluation: &'a EvaluationSet,
    diagnostics: &'a Diagnostics,
}

/// Batch pipeline over a compiled trait mapper
#[derive(Debug, Clone)]
pub struct Pipeline {
    mapper: TraitMapper,
    config: AppConfig,
}

impl Pipeline {
    pub fn new(mapper: TraitMapper, config: AppConfig) -> Self {
        Self { mapper, config }
    }

    /// Compile the lexicon named in the config (or the built-in one)
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mapper = TraitMapper::from_config(&config.mapper)?;
        Ok(Self::new(mapper, config.clone()))
    }

    pub fn mapper(&self) -> &TraitMapper {
        &self.mapper
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run every stage over one batch.
    ///
    /// Without explicit ground truth the records' declared `base_traits`
    /// are used. Only graph invariant violations are errors.
    pub fn run(
        &self,
        batch: &ExtractionBatch,
        ground_truth: Option<&[TraitAssignment]>,
    ) -> Result<PipelineOutput> {
        let run = RunInfo::start();
        let start_time = Instant::now();

        tracing::info!(run_id = %run.id, "pipeline run started");

        // 1. Normalize records
        let normalization = stages::normalize(batch);
        let mut diagnostics = normalization.diagnostics;
        tracing::debug!(
            entities = normalization.set.entities.len(),
            relationships = normalization.set.relationships.len(),
            skipped = diagnostics.len(),
            "records normalized"
        );

        // 2. Map and resolve paragraph traits
        let resolution = stages::map_traits(
            &self.mapper,
            &normalization.set,
            &batch.paragraphs,
            self.config.mapper.match_first_names,
        );
        diagnostics.extend(resolution.diagnostics);
        tracing::debug!(traits = resolution.assignments.len(), "traits resolved");

        // 3. Build the graph
        let graph = stages::build_graph(&normalization.set, &resolution.assignments)?;
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "graph built"
        );

        // 4. Evaluate
        let ground_truth = match ground_truth {
            Some(gold) => gold.to_vec(),
            None => normalization.declared_traits,
        };
        let evaluation = stages::evaluate(
            &resolution.assignments,
            &ground_truth,
            &self.config.evaluation,
        );

        let aggregate = evaluation.reference.aggregate;
        tracing::info!(
            run_id = %run.id,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            warnings = diagnostics.len(),
            precision = aggregate.precision(),
            recall = aggregate.recall(),
            f1 = aggregate.f1_score(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "pipeline run finished"
        );

        Ok(PipelineOutput {
            run,
            graph,
            normalized: normalization.set,
            traits: resolution.assignments,
            ground_truth,
            evaluation,
            diagnostics,
        })
    }

    /// Fetch a batch from the collaborator, then run synchronously
    pub async fn run_source<S>(
        &self,
        source: &S,
        ground_truth: Option<&[TraitAssignment]>,
    ) -> Result<PipelineOutput>
    where
        S: ExtractionSource + ?Sized,
    {
        tracing::debug!(source = source.name(), "fetching extraction batch");
        let batch = source.fetch().await?;
        self.run(&batch, ground_truth)
    }
}
