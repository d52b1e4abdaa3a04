//! Graph Builder
//!
//! Insertion order: entities grouped by kind, then trait nodes, then edges.
//! Inputs are expected to be normalized already; any invariant violation
//! (duplicate node, dangling endpoint, self-loop) aborts the build.

use tracing::debug;

use okg_core::{Entity, EntityKind, OkgError, Relationship, Result, TraitAssignment};

use crate::{GraphEdge, GraphNode, KnowledgeGraph, HAS_TRAIT};

/// Assembles a [`KnowledgeGraph`] from normalized inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder<'a> {
    entities: &'a [Entity],
    relationships: &'a [Relationship],
    traits: &'a [TraitAssignment],
}

impl<'a> GraphBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(mut self, entities: &'a [Entity]) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_relationships(mut self, relationships: &'a [Relationship]) -> Self {
        self.relationships = relationships;
        self
    }

    pub fn with_traits(mut self, traits: &'a [TraitAssignment]) -> Self {
        self.traits = traits;
        self
    }

    /// Build the graph, failing fast on the first invariant violation
    pub fn build(self) -> Result<KnowledgeGraph> {
        let mut graph = KnowledgeGraph::new();

        for kind in EntityKind::ALL {
            for entity in self.entities.iter().filter(|e| e.kind == kind) {
                graph.insert_node(GraphNode::Entity(entity.clone()))?;
            }
        }

        // Trait nodes take the owner's canonical id
        let mut owned = Vec::with_capacity(self.traits.len());
        for assignment in self.traits {
            let Some(owner) = graph.entity(&assignment.entity) else {
                return Err(OkgError::DanglingEdge {
                    source_id: assignment.entity.clone(),
                    target_id: assignment.node_id(),
                    label: HAS_TRAIT.to_string(),
                    missing: assignment.entity.clone(),
                });
            };
            let assignment = TraitAssignment {
                entity: owner.id.clone(),
                ..assignment.clone()
            };
            graph.insert_node(GraphNode::Trait(assignment.clone()))?;
            owned.push(assignment);
        }

        for relationship in self.relationships {
            graph.insert_edge(
                &relationship.source,
                &relationship.target,
                GraphEdge::Relation {
                    label: relationship.label.clone(),
                    evidence: relationship.evidence.clone(),
                },
            )?;
        }

        for assignment in &owned {
            graph.insert_edge(&assignment.entity, &assignment.node_id(), GraphEdge::HasTrait)?;
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built knowledge graph"
        );
        Ok(graph)
    }
}
