//! OKG Extractor - trait mapping, normalization and evaluation
//!
//! Stages between the raw collaborator output and the graph:
//! the OCEAN trait mapper with its lexicon, paragraph attribution,
//! conflict resolution, the entity/relationship normalizer, and the
//! trait evaluator.

pub mod lexicon;
pub mod mapper;
pub mod metrics;
pub mod normalizer;
pub mod paragraph;
pub mod resolve;
pub mod source;
pub mod token;

pub use lexicon::{Lexicon, LexiconEntry};
pub use mapper::{Polarity, Specificity, TraitMapper, TraitMatch, TraitMatches};
pub use metrics::{
    evaluate_all, parse_ground_truth, EntityEvaluation, EvaluationReport, EvaluationSet,
    MetricsSummary, TraitEvaluator, TraitMetrics,
};
pub use normalizer::{
    normalize_label, normalize_records, normalize_set, EntityNormalizer, NormalizedSet,
    Normalization,
};
pub use paragraph::{Mention, ParagraphScanner, TraitCandidate};
pub use resolve::{resolve_traits, TraitResolution};
pub use source::JsonSource;
