//! Graph statistics, text summary and export

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use okg_core::EntityKind;

use crate::{EdgeKind, EdgeView, KnowledgeGraph, NodeView};

/// Extraction and coverage statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_entities: usize,
    /// Semantic relationship edges (excludes `has_trait`)
    pub total_relationships: usize,
    pub traits_extracted: usize,
    /// Entities per kind
    pub entity_counts: BTreeMap<String, usize>,
    /// Relationship edges per label
    pub relationship_counts: BTreeMap<String, usize>,
    /// Directed density: E / (N * (N - 1))
    pub density: f64,
    pub people_with_traits: usize,
    /// Share of persons with at least one trait
    pub trait_assignment_rate: f64,
}

/// Serializable node/edge listing for external renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

impl KnowledgeGraph {
    pub fn stats(&self) -> GraphStats {
        let mut entity_counts = BTreeMap::new();
        for entity in self.entities() {
            *entity_counts.entry(entity.kind.to_string()).or_insert(0) += 1;
        }

        let mut relationship_counts = BTreeMap::new();
        for edge in self.graph().edge_weights() {
            if edge.kind() == EdgeKind::Relation {
                *relationship_counts.entry(edge.label().to_string()).or_insert(0) += 1;
            }
        }

        let persons: Vec<_> = self.entities_of_kind(EntityKind::Person).collect();
        let people_with_traits = persons
            .iter()
            .filter(|p| !self.traits_of(&p.id).is_empty())
            .count();

        let nodes = self.node_count();
        let edges = self.edge_count();
        let density = if nodes < 2 {
            0.0
        } else {
            edges as f64 / (nodes * (nodes - 1)) as f64
        };

        GraphStats {
            total_nodes: nodes,
            total_edges: edges,
            total_entities: entity_counts.values().sum(),
            total_relationships: relationship_counts.values().sum(),
            traits_extracted: self.trait_assignments().count(),
            entity_counts,
            relationship_counts,
            density,
            people_with_traits,
            trait_assignment_rate: if persons.is_empty() {
                0.0
            } else {
                people_with_traits as f64 / persons.len() as f64
            },
        }
    }

    /// Plain-text breakdown of the graph
    pub fn summary(&self) -> String {
        let stats = self.stats();

        let mut out = format!(
            "=== Knowledge Graph Summary ===\n\
             Nodes: {} | Edges: {} | Density: {:.3}\n\n\
             Entities:\n{}\n\
             Relationships:\n{}\n\
             Personality traits ({} of persons covered):\n",
            stats.total_nodes,
            stats.total_edges,
            stats.density,
            count_lines(&stats.entity_counts),
            count_lines(&stats.relationship_counts),
            format_percent(stats.trait_assignment_rate),
        );

        let mut persons: Vec<_> = self.entities_of_kind(EntityKind::Person).collect();
        persons.sort_by(|a, b| a.id.cmp(&b.id));
        for person in persons {
            let traits = self.traits_of(&person.id);
            if traits.is_empty() {
                continue;
            }
            let rendered: Vec<String> = traits
                .iter()
                .map(|t| format!("{}={}", t.dimension.label(), t.level))
                .collect();
            out.push_str(&format!("  {}: {}\n", person.id, rendered.join(", ")));
        }

        out
    }

    pub fn export(&self) -> GraphExport {
        GraphExport {
            nodes: self.nodes(),
            edges: self.edges(),
        }
    }
}

fn count_lines(counts: &BTreeMap<String, usize>) -> String {
    counts
        .iter()
        .map(|(name, count)| format!("  {name}: {count}\n"))
        .collect()
}

fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use okg_core::{Dimension, Entity, Level, Relationship, TraitAssignment};

    use super::*;
    use crate::GraphBuilder;

    fn sample() -> KnowledgeGraph {
        let entities = vec![
            Entity::new("Sarah Chen", EntityKind::Person),
            Entity::new("Mark Johnson", EntityKind::Person),
            Entity::new("TechCorp", EntityKind::Organization),
        ];
        let relationships = vec![
            Relationship::new("Sarah Chen", "works_at", "TechCorp"),
            Relationship::new("Mark Johnson", "works_at", "TechCorp"),
            Relationship::new("Sarah Chen", "manages", "Mark Johnson"),
        ];
        let traits = vec![TraitAssignment::new(
            "Sarah Chen",
            Dimension::Conscientiousness,
            Level::High,
        )];

        GraphBuilder::new()
            .with_entities(&entities)
            .with_relationships(&relationships)
            .with_traits(&traits)
            .build()
            .unwrap()
    }

    #[test]
    fn test_stats() {
        let stats = sample().stats();

        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.total_edges, 4);
        assert_eq!(stats.total_entities, 3);
        assert_eq!(stats.total_relationships, 3);
        assert_eq!(stats.traits_extracted, 1);
        assert_eq!(stats.entity_counts["person"], 2);
        assert_eq!(stats.relationship_counts["works_at"], 2);
        assert_eq!(stats.people_with_traits, 1);
        assert!((stats.trait_assignment_rate - 0.5).abs() < 1e-9);
        assert!((stats.density - 4.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_graph_stats() {
        let stats = KnowledgeGraph::new().stats();
        assert_eq!(stats.total_nodes, 0);
        assert_eq!(stats.density, 0.0);
        assert_eq!(stats.trait_assignment_rate, 0.0);
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary();

        assert!(summary.contains("person: 2"));
        assert!(summary.contains("manages: 1"));
        assert!(summary.contains("Sarah Chen: Conscientiousness=high"));
        assert!(!summary.contains("Mark Johnson:"));
        assert!(summary.contains("(50.0% of persons covered)"));
        assert!(summary.starts_with("=== Knowledge Graph Summary ===\nNodes: 4 | Edges: 4"));
    }

    #[test]
    fn test_export_serializes() {
        let export = sample().export();
        let json = serde_json::to_value(&export).unwrap();

        assert_eq!(json["nodes"].as_array().unwrap().len(), 4);
        assert_eq!(json["edges"][0]["kind"], "relation");
    }
}
