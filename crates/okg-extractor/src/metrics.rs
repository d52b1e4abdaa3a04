//! Trait Evaluation Metrics
//!
//! Scores predicted trait assignments against ground truth with
//! precision, recall and F1. Matching is one-to-one per entity; the
//! aggregate is micro-averaged (counts summed across entities before the
//! ratios are taken). The macro average of per-entity F1 is reported
//! separately and never replaces it.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use okg_core::{
    match_key, Dimension, EvaluationConfig, Level, MatchMode, OkgError, Result, TraitAssignment,
};

// ============================================================================
// Trait Metrics
// ============================================================================

/// Confusion counts for trait assignments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitMetrics {
    /// Predictions matched to a ground-truth assignment
    pub true_positives: usize,
    /// Predictions with no match
    pub false_positives: usize,
    /// Ground-truth assignments with no matching prediction
    pub false_negatives: usize,
    /// Total ground-truth assignments
    pub gold_total: usize,
    /// Total predictions
    pub predicted_total: usize,
}

impl TraitMetrics {
    /// Calculate precision (TP / (TP + FP))
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// Calculate recall (TP / (TP + FN))
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Calculate F1 score (2 * P * R / (P + R))
    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Sum another set of counts into this one
    pub fn add(&mut self, other: &TraitMetrics) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.gold_total += other.gold_total;
        self.predicted_total += other.predicted_total;
    }

    /// Plain report values, ratios rounded to three decimals
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            precision: round3(self.precision()),
            recall: round3(self.recall()),
            f1: round3(self.f1_score()),
            tp: self.true_positives,
            fp: self.false_positives,
            fn_: self.false_negatives,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Metrics report entry: `precision, recall, f1, tp, fp, fn`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl MetricsSummary {
    /// Key/value view of the summary
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
            ("tp", self.tp as f64),
            ("fp", self.fp as f64),
            ("fn", self.fn_ as f64),
        ])
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Metrics for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEvaluation {
    /// Entity name as first seen in the inputs
    pub entity: String,
    pub metrics: TraitMetrics,
}

/// Per-entity and aggregate results for one match mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub mode: MatchMode,
    /// Sorted by case-folded entity name
    pub per_entity: Vec<EntityEvaluation>,
    /// Micro-averaged counts
    pub aggregate: TraitMetrics,
}

impl EvaluationReport {
    /// Metrics for one entity (case-insensitive)
    pub fn entity(&self, name: &str) -> Option<&TraitMetrics> {
        let key = match_key(name);
        self.per_entity
            .iter()
            .find(|e| match_key(&e.entity) == key)
            .map(|e| &e.metrics)
    }

    /// Mean of per-entity F1 scores (reference only)
    pub fn macro_f1(&self) -> f64 {
        if self.per_entity.is_empty() {
            return 0.0;
        }
        let total: f64 = self.per_entity.iter().map(|e| e.metrics.f1_score()).sum();
        total / self.per_entity.len() as f64
    }

    /// Per-entity summaries keyed by entity name
    pub fn per_entity_summaries(&self) -> BTreeMap<String, MetricsSummary> {
        self.per_entity
            .iter()
            .map(|e| (e.entity.clone(), e.metrics.summary()))
            .collect()
    }

    /// Render a summary report
    pub fn report(&self) -> String {
        let mut out = format!(
            "=== Trait Evaluation Report ({}) ===\n\n\
             Aggregate (micro-averaged):\n\
               Precision: {:.1}%\n\
               Recall:    {:.1}%\n\
               F1 Score:  {:.1}%\n\
               Gold: {} | Predicted: {} | TP: {} | FP: {} | FN: {}\n\
             Macro F1 (reference only): {:.1}%\n",
            self.mode,
            self.aggregate.precision() * 100.0,
            self.aggregate.recall() * 100.0,
            self.aggregate.f1_score() * 100.0,
            self.aggregate.gold_total,
            self.aggregate.predicted_total,
            self.aggregate.true_positives,
            self.aggregate.false_positives,
            self.aggregate.false_negatives,
            self.macro_f1() * 100.0,
        );

        if !self.per_entity.is_empty() {
            out.push_str("\nPer entity:\n");
            for e in &self.per_entity {
                out.push_str(&format!(
                    "  {}: P={:.3} R={:.3} F1={:.3} (tp={} fp={} fn={})\n",
                    e.entity,
                    e.metrics.precision(),
                    e.metrics.recall(),
                    e.metrics.f1_score(),
                    e.metrics.true_positives,
                    e.metrics.false_positives,
                    e.metrics.false_negatives,
                ));
            }
        }
        out
    }
}

/// Evaluator for trait assignments
#[derive(Debug, Clone, Default)]
pub struct TraitEvaluator {
    mode: MatchMode,
}

#[derive(Default)]
struct EntityBucket<'a> {
    display: String,
    predicted: Vec<&'a TraitAssignment>,
    gold: Vec<&'a TraitAssignment>,
}

impl TraitEvaluator {
    /// Exact (entity, dimension, level) matching
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Evaluate predictions against ground truth
    pub fn evaluate(
        &self,
        predicted: &[TraitAssignment],
        gold: &[TraitAssignment],
    ) -> EvaluationReport {
        let mut buckets: BTreeMap<String, EntityBucket<'_>> = BTreeMap::new();
        for (assignment, is_gold) in predicted
            .iter()
            .map(|a| (a, false))
            .chain(gold.iter().map(|a| (a, true)))
        {
            let bucket = buckets
                .entry(match_key(&assignment.entity))
                .or_insert_with(|| EntityBucket {
                    display: assignment.entity.clone(),
                    ..Default::default()
                });
            if is_gold {
                bucket.gold.push(assignment);
            } else {
                bucket.predicted.push(assignment);
            }
        }

        let mut aggregate = TraitMetrics::default();
        let per_entity = buckets
            .into_values()
            .map(|bucket| {
                let metrics = self.score(&bucket.predicted, &bucket.gold);
                aggregate.add(&metrics);
                EntityEvaluation {
                    entity: bucket.display,
                    metrics,
                }
            })
            .collect();

        EvaluationReport {
            mode: self.mode,
            per_entity,
            aggregate,
        }
    }

    /// Greedy one-to-one matching within a single entity
    fn score(&self, predicted: &[&TraitAssignment], gold: &[&TraitAssignment]) -> TraitMetrics {
        let mut matched_gold: HashSet<usize> = HashSet::new();
        let mut matched_predicted: HashSet<usize> = HashSet::new();

        let exact = |p: &TraitAssignment, g: &TraitAssignment| {
            p.dimension == g.dimension && p.level == g.level
        };
        let retrieval =
            |p: &TraitAssignment, g: &TraitAssignment| p.dimension == g.dimension;

        let mut passes: Vec<&dyn Fn(&TraitAssignment, &TraitAssignment) -> bool> = vec![&exact];
        if self.mode == MatchMode::Retrieval {
            passes.push(&retrieval);
        }

        for matches in passes {
            for (pi, pred) in predicted.iter().enumerate() {
                if matched_predicted.contains(&pi) {
                    continue;
                }
                let hit = gold
                    .iter()
                    .enumerate()
                    .find(|(gi, g)| !matched_gold.contains(gi) && matches(*pred, **g));
                if let Some((gi, _)) = hit {
                    matched_gold.insert(gi);
                    matched_predicted.insert(pi);
                }
            }
        }

        let true_positives = matched_predicted.len();
        TraitMetrics {
            true_positives,
            false_positives: predicted.len() - true_positives,
            false_negatives: gold.len() - matched_gold.len(),
            gold_total: gold.len(),
            predicted_total: predicted.len(),
        }
    }
}

/// Reference report plus the optional alternative interpretation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSet {
    /// Report in the configured mode
    pub reference: EvaluationReport,
    /// Retrieval report when the reference is exact and it was requested
    pub retrieval: Option<EvaluationReport>,
}

/// Evaluate in the configured mode, plus retrieval mode when requested
pub fn evaluate_all(
    predicted: &[TraitAssignment],
    gold: &[TraitAssignment],
    config: &EvaluationConfig,
) -> EvaluationSet {
    let reference = TraitEvaluator::new()
        .with_mode(config.mode)
        .evaluate(predicted, gold);
    let retrieval = (config.include_retrieval && config.mode == MatchMode::Exact).then(|| {
        TraitEvaluator::new()
            .with_mode(MatchMode::Retrieval)
            .evaluate(predicted, gold)
    });

    EvaluationSet {
        reference,
        retrieval,
    }
}

// ============================================================================
// Ground truth input
// ============================================================================

#[derive(Deserialize)]
struct GroundTruthRow {
    entity: String,
    dimension: String,
    level: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GroundTruthDocument {
    /// `[{"entity": ..., "dimension": ..., "level": ...}]`
    Rows(Vec<GroundTruthRow>),
    /// `{"Sarah Chen": {"openness": "high"}}`
    ByEntity(BTreeMap<String, BTreeMap<String, String>>),
}

/// Parse ground-truth assignments; dimension and level names are
/// case-insensitive
pub fn parse_ground_truth(json: &str) -> Result<Vec<TraitAssignment>> {
    let document: GroundTruthDocument = serde_json::from_str(json)
        .map_err(|e| OkgError::ParseError(format!("ground truth: {e}")))?;

    let rows: Vec<(String, String, String)> = match document {
        GroundTruthDocument::Rows(rows) => rows
            .into_iter()
            .map(|r| (r.entity, r.dimension, r.level))
            .collect(),
        GroundTruthDocument::ByEntity(map) => map
            .into_iter()
            .flat_map(|(entity, traits)| {
                traits
                    .into_iter()
                    .map(move |(dimension, level)| (entity.clone(), dimension, level))
            })
            .collect(),
    };

    rows.into_iter()
        .map(|(entity, dimension, level)| {
            let dimension: Dimension = dimension.parse()?;
            let level: Level = level.parse()?;
            Ok(TraitAssignment::new(&entity, dimension, level))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
