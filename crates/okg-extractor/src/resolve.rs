//! Trait conflict resolution
//!
//! Keeps at most one assignment per (entity, dimension). The candidate with
//! the greater specificity wins; on a tie the first one seen is kept.

use std::collections::HashMap;

use okg_core::{match_key, Diagnostics, Dimension, ExtractionWarning, TraitAssignment};
use tracing::debug;

use crate::mapper::Specificity;
use crate::paragraph::TraitCandidate;

/// Outcome of resolving a candidate stream
#[derive(Debug, Clone, Default)]
pub struct TraitResolution {
    /// One assignment per (entity, dimension), in first-seen order
    pub assignments: Vec<TraitAssignment>,
    pub diagnostics: Diagnostics,
}

/// Resolve conflicting candidates across a whole extraction pass
pub fn resolve_traits<I>(candidates: I) -> TraitResolution
where
    I: IntoIterator<Item = TraitCandidate>,
{
    let mut slots: HashMap<(String, Dimension), usize> = HashMap::new();
    let mut held: Vec<(TraitAssignment, Specificity)> = Vec::new();
    let mut diagnostics = Diagnostics::new();

    for candidate in candidates {
        let key = (
            match_key(&candidate.assignment.entity),
            candidate.assignment.dimension,
        );

        let Some(&slot) = slots.get(&key) else {
            slots.insert(key, held.len());
            held.push((candidate.assignment, candidate.specificity));
            continue;
        };

        let (current, current_specificity) = &mut held[slot];
        let replace = candidate.specificity > *current_specificity;
        let (kept, discarded) = if replace {
            (candidate.assignment.level, current.level)
        } else {
            (current.level, candidate.assignment.level)
        };

        if kept != discarded {
            diagnostics.warn(ExtractionWarning::TraitConflict {
                entity: current.entity.clone(),
                dimension: current.dimension,
                kept,
                discarded,
            });
        }

        if replace {
            debug!(
                entity = %current.entity,
                dimension = %current.dimension,
                surface = %candidate.surface,
                "more specific trait evidence replaces earlier match"
            );
            *current = candidate.assignment;
            *current_specificity = candidate.specificity;
        }
    }

    TraitResolution {
        assignments: held.into_iter().map(|(assignment, _)| assignment).collect(),
        diagnostics,
    }
}
