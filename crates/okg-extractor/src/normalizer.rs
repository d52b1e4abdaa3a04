//! Entity/Relationship Normalizer
//!
//! Turns raw character records into a canonical entity and relationship
//! set. Entity ids keep the display casing of the first occurrence; all
//! matching goes through the case-folded key.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use okg_core::{
    canonical_name, match_key, Diagnostics, Dimension, Entity, EntityKind, Evidence,
    ExtractionBatch, ExtractionWarning, Level, RawCharacter, Relationship, TraitAssignment,
};

pub const WORKS_AT: &str = "works_at";
pub const LOCATED_IN: &str = "located_in";

// ============================================================================
// Output types
// ============================================================================

/// Canonical entities and relationships
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSet {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl NormalizedSet {
    /// Look up an entity by (case-insensitive) name
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        let key = match_key(name);
        self.entities.iter().find(|e| e.key() == key)
    }

    pub fn persons(&self) -> impl Iterator<Item = &Entity> {
        self.entities
            .iter()
            .filter(|e| e.kind == EntityKind::Person)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Result of normalizing a batch
#[derive(Debug, Clone, Default)]
pub struct Normalization {
    pub set: NormalizedSet,
    /// Traits declared in the records' `base_traits`
    pub declared_traits: Vec<TraitAssignment>,
    pub diagnostics: Diagnostics,
}

// ============================================================================
// Normalizer
// ============================================================================

/// Accumulates entities, resolving relationships once all are known
#[derive(Debug, Default)]
pub struct EntityNormalizer {
    /// match key -> index into `entities`
    entity_map: HashMap<String, usize>,
    entities: Vec<Entity>,
    pending: Vec<Relationship>,
    diagnostics: Diagnostics,
}

impl EntityNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or merge an entity; returns its canonical id, or `None` if rejected
    pub fn add_entity(&mut self, entity: Entity) -> Option<String> {
        let id = canonical_name(&entity.id);
        if id.is_empty() {
            return None;
        }
        let key = match_key(&id);

        if let Some(&index) = self.entity_map.get(&key) {
            let existing = &mut self.entities[index];
            if existing.kind != entity.kind {
                let existing_kind = existing.kind;
                self.diagnostics.warn(ExtractionWarning::KindConflict {
                    name: id,
                    existing: existing_kind,
                    rejected: entity.kind,
                });
                return None;
            }

            for (name, value) in entity.attributes {
                if !value.trim().is_empty() {
                    existing.attributes.insert(name, value);
                }
            }
            return Some(existing.id.clone());
        }

        let mut entity = entity;
        entity.id = id.clone();
        entity.attributes.retain(|_, value| !value.trim().is_empty());

        self.entity_map.insert(key, self.entities.len());
        self.entities.push(entity);
        Some(id)
    }

    /// Queue a relationship; endpoints are resolved in [`finish`](Self::finish)
    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.pending.push(relationship);
    }

    /// Canonical id for a name, if known
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.entity_map
            .get(&match_key(name))
            .map(|&index| self.entities[index].id.as_str())
    }

    /// Record a warning alongside the normalizer's own
    pub fn warn(&mut self, warning: ExtractionWarning) {
        self.diagnostics.warn(warning);
    }

    /// Validate queued relationships and return the canonical set
    pub fn finish(mut self) -> (NormalizedSet, Diagnostics) {
        let pending = std::mem::take(&mut self.pending);
        let mut seen: HashSet<(String, String, String)> = HashSet::new();
        let mut relationships = Vec::with_capacity(pending.len());

        for relationship in pending {
            let label = normalize_label(&relationship.label);
            if label.is_empty() {
                self.diagnostics.warn(ExtractionWarning::EmptyRelationLabel {
                    source: relationship.source,
                    target: relationship.target,
                });
                continue;
            }

            let source = self.resolve(&relationship.source).map(str::to_string);
            let target = self.resolve(&relationship.target).map(str::to_string);
            let (source, target) = match (source, target) {
                (Some(source), Some(target)) => (source, target),
                (source, _) => {
                    let missing = if source.is_none() {
                        relationship.source.clone()
                    } else {
                        relationship.target.clone()
                    };
                    self.diagnostics
                        .warn(ExtractionWarning::UnresolvedRelationship {
                            source: relationship.source,
                            label,
                            target: relationship.target,
                            missing,
                        });
                    continue;
                }
            };

            if source == target {
                self.diagnostics.warn(ExtractionWarning::SelfLoopDropped {
                    entity: source,
                    label,
                });
                continue;
            }

            if !seen.insert((match_key(&source), label.clone(), match_key(&target))) {
                continue;
            }

            relationships.push(Relationship {
                source,
                target,
                label,
                evidence: relationship.evidence,
            });
        }

        debug!(
            entities = self.entities.len(),
            relationships = relationships.len(),
            warnings = self.diagnostics.len(),
            "normalized entity set"
        );

        (
            NormalizedSet {
                entities: self.entities,
                relationships,
            },
            self.diagnostics,
        )
    }
}

/// Lower-case, trim and collapse whitespace in a relation label
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// Stages
// ============================================================================

/// Normalize raw character records
pub fn normalize_records(batch: &ExtractionBatch) -> Normalization {
    let mut normalizer = EntityNormalizer::new();
    let mut declared = DeclaredTraits::default();

    for (index, value) in batch.characters.iter().enumerate() {
        if !value.is_object() {
            normalizer.warn(skipped(index, "record is not an object"));
            continue;
        }
        let record: RawCharacter = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(e) => {
                normalizer.warn(skipped(index, &e.to_string()));
                continue;
            }
        };
        let name = record
            .name
            .as_deref()
            .map(canonical_name)
            .unwrap_or_default();
        if name.is_empty() {
            normalizer.warn(skipped(index, "missing required field `name`"));
            continue;
        }

        let mut person = Entity::new(&name, EntityKind::Person);
        if let Some(role) = record.role.as_deref() {
            person = person.with_attribute("role", role.trim());
        }
        let Some(person_id) = normalizer.add_entity(person) else {
            continue;
        };
        let evidence = Evidence::record(index);

        let affiliations = [
            (record.organization.as_deref(), EntityKind::Organization, WORKS_AT),
            (record.location.as_deref(), EntityKind::Location, LOCATED_IN),
        ];
        for (name, kind, label) in affiliations {
            let Some(target) = name.and_then(|n| normalizer.add_entity(Entity::new(n, kind))) else {
                continue;
            };
            normalizer.add_relationship(
                Relationship::new(&person_id, label, &target).with_evidence(evidence.clone()),
            );
        }

        for (label, targets) in &record.relationships {
            for target in targets.iter() {
                normalizer.add_relationship(
                    Relationship::new(&person_id, label, target).with_evidence(evidence.clone()),
                );
            }
        }

        for (dimension, level) in &record.base_traits {
            let parsed = dimension
                .parse::<Dimension>()
                .and_then(|d| level.parse::<Level>().map(|l| (d, l)));
            match parsed {
                Ok((dimension, level)) => declared.push(
                    TraitAssignment::new(&person_id, dimension, level)
                        .with_evidence(evidence.clone()),
                    &mut normalizer,
                ),
                Err(_) => normalizer.warn(ExtractionWarning::InvalidTrait {
                    entity: person_id.clone(),
                    dimension: dimension.clone(),
                    level: level.clone(),
                }),
            }
        }
    }

    let (set, diagnostics) = normalizer.finish();
    Normalization {
        set,
        declared_traits: declared.assignments,
        diagnostics,
    }
}

/// Re-apply the normalization rules to an existing set
pub fn normalize_set(set: &NormalizedSet) -> (NormalizedSet, Diagnostics) {
    let mut normalizer = EntityNormalizer::new();
    for entity in &set.entities {
        normalizer.add_entity(entity.clone());
    }
    for relationship in &set.relationships {
        normalizer.add_relationship(relationship.clone());
    }
    normalizer.finish()
}

fn skipped(index: usize, reason: &str) -> ExtractionWarning {
    ExtractionWarning::SkippedRecord {
        index,
        reason: reason.to_string(),
    }
}

/// Declared traits, first assignment per (entity, dimension) wins
#[derive(Default)]
struct DeclaredTraits {
    assignments: Vec<TraitAssignment>,
    index: HashMap<(String, Dimension), usize>,
}

impl DeclaredTraits {
    fn push(&mut self, assignment: TraitAssignment, normalizer: &mut EntityNormalizer) {
        let key = (match_key(&assignment.entity), assignment.dimension);
        match self.index.get(&key) {
            Some(&i) => {
                let kept = &self.assignments[i];
                if kept.level != assignment.level {
                    normalizer.warn(ExtractionWarning::TraitConflict {
                        entity: kept.entity.clone(),
                        dimension: kept.dimension,
                        kept: kept.level,
                        discarded: assignment.level,
                    });
                }
            }
            None => {
                self.index.insert(key, self.assignments.len());
                self.assignments.push(assignment);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use okg_core::RawParagraph;

    fn batch(records: &[RawCharacter]) -> ExtractionBatch {
        ExtractionBatch::from_records(records, Vec::<RawParagraph>::new()).unwrap()
    }

    fn sarah() -> RawCharacter {
        RawCharacter::named("Sarah Chen")
            .with_role("CEO")
            .with_organization("TechCorp")
            .with_location("San Francisco")
            .with_trait("Openness", "high")
            .with_relationship("manages", &["David Rodriguez"])
    }

    #[test]
    fn test_record_yields_entities_and_affiliations() {
        let result = normalize_records(&batch(&[
            sarah(),
            RawCharacter::named("David Rodriguez").with_organization("techcorp"),
        ]));

        let ids: Vec<_> = result.set.entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["Sarah Chen", "TechCorp", "San Francisco", "David Rodriguez"]
        );
        assert_eq!(
            result.set.entity("sarah chen").unwrap().attributes.get("role"),
            Some(&"CEO".to_string())
        );

        let triples: Vec<_> = result
            .set
            .relationships
            .iter()
            .map(|r| (r.source.as_str(), r.label.as_str(), r.target.as_str()))
            .collect();
        assert_eq!(
            triples,
            vec![
                ("Sarah Chen", "works_at", "TechCorp"),
                ("Sarah Chen", "located_in", "San Francisco"),
                ("Sarah Chen", "manages", "David Rodriguez"),
                ("David Rodriguez", "works_at", "TechCorp"),
            ]
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_relationship_target_dropped() {
        let result = normalize_records(&batch(&[RawCharacter::named("David Rodriguez")
            .with_relationship("manages", &["Unknown Person"])]));

        assert_eq!(result.set.entities.len(), 1);
        assert!(result.set.relationships.is_empty());
        assert_eq!(
            result.diagnostics.warnings(),
            &[ExtractionWarning::UnresolvedRelationship {
                source: "David Rodriguez".to_string(),
                label: "manages".to_string(),
                target: "Unknown Person".to_string(),
                missing: "Unknown Person".to_string(),
            }]
        );
    }

    #[test]
    fn test_malformed_records_skipped() {
        let json = r#"{
            "characters": [
                42,
                {"role": "CTO"},
                {"name": "   "},
                {"name": "Ana Silva", "base_traits": "high"},
                {"name": "Mark Johnson"}
            ]
        }"#;
        let result = normalize_records(&ExtractionBatch::from_json(json).unwrap());

        assert_eq!(result.set.entities.len(), 1);
        assert_eq!(result.set.entities[0].id, "Mark Johnson");
        let skipped: Vec<_> = result
            .diagnostics
            .warnings()
            .iter()
            .filter_map(|w| match w {
                ExtractionWarning::SkippedRecord { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(skipped, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_dedup_keeps_first_display_name() {
        let mut normalizer = EntityNormalizer::new();
        let first = normalizer.add_entity(
            Entity::new("  Sarah   Chen ", EntityKind::Person).with_attribute("role", "CEO"),
        );
        let second = normalizer.add_entity(
            Entity::new("SARAH CHEN", EntityKind::Person)
                .with_attribute("role", "Founder")
                .with_attribute("team", ""),
        );

        assert_eq!(first.as_deref(), Some("Sarah Chen"));
        assert_eq!(second.as_deref(), Some("Sarah Chen"));

        let (set, diagnostics) = normalizer.finish();
        assert_eq!(set.entities.len(), 1);
        assert_eq!(set.entities[0].attributes.get("role").unwrap(), "Founder");
        assert!(!set.entities[0].attributes.contains_key("team"));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_kind_conflict_rejected() {
        let mut normalizer = EntityNormalizer::new();
        normalizer.add_entity(Entity::new("Phoenix", EntityKind::Person));
        let rejected = normalizer.add_entity(Entity::new("phoenix", EntityKind::Location));

        assert!(rejected.is_none());
        let (set, diagnostics) = normalizer.finish();
        assert_eq!(set.entities.len(), 1);
        assert_eq!(
            diagnostics.warnings(),
            &[ExtractionWarning::KindConflict {
                name: "phoenix".to_string(),
                existing: EntityKind::Person,
                rejected: EntityKind::Location,
            }]
        );
    }

    #[test]
    fn test_labels_self_loops_and_duplicates() {
        let mut normalizer = EntityNormalizer::new();
        normalizer.add_entity(Entity::new("Ana", EntityKind::Person));
        normalizer.add_entity(Entity::new("Ben", EntityKind::Person));

        normalizer.add_relationship(Relationship::new("Ana", "  Collaborates   With ", "ben"));
        normalizer.add_relationship(Relationship::new("ana", "collaborates with", "Ben"));
        normalizer.add_relationship(Relationship::new("Ana", "mentors", "ANA"));
        normalizer.add_relationship(Relationship::new("Ana", "   ", "Ben"));

        let (set, diagnostics) = normalizer.finish();
        assert_eq!(
            set.relationships,
            vec![Relationship::new("Ana", "collaborates with", "Ben")]
        );
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics.count(|w| matches!(w, ExtractionWarning::SelfLoopDropped { .. })),
            1
        );
        assert_eq!(
            diagnostics.count(|w| matches!(w, ExtractionWarning::EmptyRelationLabel { .. })),
            1
        );
    }

    #[test]
    fn test_declared_traits() {
        let result = normalize_records(&batch(&[
            sarah()
                .with_trait("conscientiousness", "High")
                .with_trait("charisma", "high"),
            RawCharacter::named("sarah chen").with_trait("openness", "low"),
        ]));

        let declared: Vec<_> = result
            .declared_traits
            .iter()
            .map(|t| (t.entity.as_str(), t.dimension, t.level))
            .collect();
        // base_traits keys iterate in byte order: "Openness" < "conscientiousness"
        assert_eq!(
            declared,
            vec![
                ("Sarah Chen", Dimension::Openness, Level::High),
                ("Sarah Chen", Dimension::Conscientiousness, Level::High),
            ]
        );
        assert_eq!(
            result
                .diagnostics
                .count(|w| matches!(w, ExtractionWarning::InvalidTrait { .. })),
            1
        );
        assert_eq!(
            result
                .diagnostics
                .count(|w| matches!(w, ExtractionWarning::TraitConflict { .. })),
            1
        );
    }

    #[test]
    fn test_normalize_set_is_fixed_point() {
        let result = normalize_records(&batch(&[
            sarah(),
            RawCharacter::named("David Rodriguez")
                .with_relationship("reports_to", &["Sarah Chen"]),
        ]));

        let (again, diagnostics) = normalize_set(&result.set);
        assert_eq!(again, result.set);
        assert!(diagnostics.is_empty());
    }
}
