//! Pipeline stages
//!
//! Each stage takes immutable inputs and returns new structures, so the
//! pipeline can be exercised one stage at a time.

use okg_core::{EntityKind, EvaluationConfig, RawParagraph, Result, TraitAssignment};
use okg_extractor::{
    evaluate_all, resolve_traits, EvaluationSet, NormalizedSet, ParagraphScanner, TraitMapper,
    TraitResolution,
};
use okg_graph::{GraphBuilder, KnowledgeGraph};

pub use okg_extractor::normalize_records as normalize;

/// Scan paragraphs for trait evidence on the set's persons and resolve conflicts
pub fn map_traits(
    mapper: &TraitMapper,
    set: &NormalizedSet,
    paragraphs: &[RawParagraph],
    match_first_names: bool,
) -> TraitResolution {
    let persons = set
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::Person)
        .map(|e| e.id.as_str());
    let scanner = ParagraphScanner::new(mapper, persons, match_first_names);

    resolve_traits(scanner.scan_all(paragraphs))
}

/// Build the graph from normalized entities/relationships and resolved traits
pub fn build_graph(set: &NormalizedSet, traits: &[TraitAssignment]) -> Result<KnowledgeGraph> {
    GraphBuilder::new()
        .with_entities(&set.entities)
        .with_relationships(&set.relationships)
        .with_traits(traits)
        .build()
}

/// Score predicted traits against ground truth
pub fn evaluate(
    predicted: &[TraitAssignment],
    ground_truth: &[TraitAssignment],
    config: &EvaluationConfig,
) -> EvaluationSet {
    evaluate_all(predicted, ground_truth, config)
}
