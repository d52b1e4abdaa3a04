//! OKG Graph - typed knowledge graph
//!
//! Entities, their relationships and their trait assignments in one
//! directed multigraph backed by petgraph. Trait assignments are nodes of
//! their own, linked from their entity by a `has_trait` edge, so they can
//! be listed and queried like any other graph element.
//!
//! Node ids are the canonical entity names, and `"{entity}::{dimension}"`
//! for trait nodes. Lookups are case-insensitive.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use okg_core::{
    match_key, Dimension, Entity, EntityKind, Evidence, Level, OkgError, Result, TraitAssignment,
};

pub mod builder;
pub mod stats;

pub use builder::GraphBuilder;
pub use stats::{GraphExport, GraphStats};

/// Label reported for entity -> trait edges
pub const HAS_TRAIT: &str = "has_trait";

// ============================================================================
// Node and edge types
// ============================================================================

/// Node kind as exposed to renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Person,
    Organization,
    Location,
    Trait,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Location => "location",
            Self::Trait => "trait",
        }
    }
}

impl From<EntityKind> for NodeKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Person => Self::Person,
            EntityKind::Organization => Self::Organization,
            EntityKind::Location => Self::Location,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphNode {
    Entity(Entity),
    Trait(TraitAssignment),
}

impl GraphNode {
    pub fn id(&self) -> String {
        match self {
            Self::Entity(entity) => entity.id.clone(),
            Self::Trait(assignment) => assignment.node_id(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Entity(entity) => entity.kind.into(),
            Self::Trait(_) => NodeKind::Trait,
        }
    }

    /// Display label: the entity name, or "Openness: high"
    pub fn label(&self) -> String {
        match self {
            Self::Entity(entity) => entity.id.clone(),
            Self::Trait(assignment) => {
                format!("{}: {}", assignment.dimension.label(), assignment.level)
            }
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            Self::Trait(_) => None,
        }
    }

    pub fn as_trait(&self) -> Option<&TraitAssignment> {
        match self {
            Self::Trait(assignment) => Some(assignment),
            Self::Entity(_) => None,
        }
    }
}

/// Edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Relation,
    HasTrait,
}

/// Edge payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEdge {
    /// Labelled relationship between two entities
    Relation {
        label: String,
        evidence: Option<Evidence>,
    },
    /// Entity -> trait assignment
    HasTrait,
}

impl GraphEdge {
    pub fn kind(&self) -> EdgeKind {
        match self {
            Self::Relation { .. } => EdgeKind::Relation,
            Self::HasTrait => EdgeKind::HasTrait,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Relation { label, .. } => label,
            Self::HasTrait => HAS_TRAIT,
        }
    }
}

/// Node listing entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
}

/// Edge listing entry (directed source -> target)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub label: String,
}

// ============================================================================
// Knowledge graph
// ============================================================================

/// Read-mostly knowledge graph; built once by [`GraphBuilder`]
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    /// match key of the node id -> index
    node_index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_node(&mut self, node: GraphNode) -> Result<NodeIndex> {
        let id = node.id();
        let key = match_key(&id);
        if self.node_index.contains_key(&key) {
            return Err(OkgError::DuplicateNode(id));
        }

        let index = self.graph.add_node(node);
        self.node_index.insert(key, index);
        Ok(index)
    }

    pub(crate) fn insert_edge(
        &mut self,
        source: &str,
        target: &str,
        edge: GraphEdge,
    ) -> Result<EdgeIndex> {
        let dangling = |missing: &str| OkgError::DanglingEdge {
            source_id: source.to_string(),
            target_id: target.to_string(),
            label: edge.label().to_string(),
            missing: missing.to_string(),
        };
        let from = self.index_of(source).ok_or_else(|| dangling(source))?;
        let to = self.index_of(target).ok_or_else(|| dangling(target))?;

        if from == to {
            return Err(OkgError::SelfLoop {
                entity: source.to_string(),
                label: edge.label().to_string(),
            });
        }

        Ok(self.graph.add_edge(from, to, edge))
    }

    fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_index.get(&match_key(id)).copied()
    }

    /// Underlying petgraph graph, for algorithms
    pub fn graph(&self) -> &DiGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index_of(id).map(|index| &self.graph[index])
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.node(id).and_then(GraphNode::as_entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.graph.node_weights().filter_map(GraphNode::as_entity)
    }

    pub fn entities_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities().filter(move |e| e.kind == kind)
    }

    pub fn trait_assignments(&self) -> impl Iterator<Item = &TraitAssignment> {
        self.graph.node_weights().filter_map(GraphNode::as_trait)
    }

    // ------------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------------

    /// All nodes with kind, sorted by id
    pub fn nodes(&self) -> Vec<NodeView> {
        let mut nodes: Vec<NodeView> = self
            .graph
            .node_weights()
            .map(|node| NodeView {
                id: node.id(),
                kind: node.kind(),
                label: node.label(),
            })
            .collect();
        nodes.sort();
        nodes
    }

    /// All edges with label and direction, sorted
    pub fn edges(&self) -> Vec<EdgeView> {
        let mut edges: Vec<EdgeView> = self
            .graph
            .edge_references()
            .map(|edge| self.edge_view(edge.source(), edge.target(), edge.weight()))
            .collect();
        edges.sort();
        edges
    }

    pub fn node_set(&self) -> BTreeSet<NodeView> {
        self.nodes().into_iter().collect()
    }

    pub fn edge_set(&self) -> BTreeSet<EdgeView> {
        self.edges().into_iter().collect()
    }

    fn edge_view(&self, source: NodeIndex, target: NodeIndex, edge: &GraphEdge) -> EdgeView {
        EdgeView {
            source: self.graph[source].id(),
            target: self.graph[target].id(),
            kind: edge.kind(),
            label: edge.label().to_string(),
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Trait assignments of an entity, in dimension order
    pub fn traits_of(&self, entity: &str) -> Vec<&TraitAssignment> {
        let Some(index) = self.index_of(entity) else {
            return Vec::new();
        };

        let mut traits: Vec<&TraitAssignment> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .filter(|edge| edge.weight().kind() == EdgeKind::HasTrait)
            .filter_map(|edge| self.graph[edge.target()].as_trait())
            .collect();
        traits.sort_by_key(|t| t.dimension);
        traits
    }

    /// Entities carrying a given dimension at a given level, sorted by id
    pub fn entities_with_trait(&self, dimension: Dimension, level: Level) -> Vec<&Entity> {
        let mut entities: Vec<&Entity> = self
            .graph
            .node_indices()
            .filter(|&index| {
                matches!(&self.graph[index], GraphNode::Trait(t) if t.dimension == dimension && t.level == level)
            })
            .flat_map(|index| self.graph.neighbors_directed(index, Direction::Incoming))
            .filter_map(|index| self.graph[index].as_entity())
            .collect();
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        entities.dedup_by(|a, b| a.id == b.id);
        entities
    }

    /// Outgoing semantic relationships of an entity, sorted
    pub fn relations_from(&self, entity: &str) -> Vec<EdgeView> {
        let Some(index) = self.index_of(entity) else {
            return Vec::new();
        };

        let mut relations: Vec<EdgeView> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .filter(|edge| edge.weight().kind() == EdgeKind::Relation)
            .map(|edge| self.edge_view(edge.source(), edge.target(), edge.weight()))
            .collect();
        relations.sort();
        relations
    }

    /// Ids of all nodes adjacent in either direction, sorted and unique
    pub fn neighbors(&self, id: &str) -> Vec<String> {
        let Some(index) = self.index_of(id) else {
            return Vec::new();
        };

        let neighbors: BTreeSet<String> = self
            .graph
            .neighbors_undirected(index)
            .map(|n| self.graph[n].id())
            .collect();
        neighbors.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use okg_core::Relationship;

    fn sample() -> KnowledgeGraph {
        let entities = vec![
            Entity::new("Sarah Chen", EntityKind::Person).with_attribute("role", "CEO"),
            Entity::new("Mark Johnson", EntityKind::Person),
            Entity::new("TechCorp", EntityKind::Organization),
        ];
        let relationships = vec![
            Relationship::new("Sarah Chen", "manages", "Mark Johnson"),
            Relationship::new("Sarah Chen", "works_at", "TechCorp"),
            Relationship::new("Mark Johnson", "collaborates_with", "Sarah Chen"),
        ];
        let traits = vec![
            TraitAssignment::new("Sarah Chen", Dimension::Openness, Level::High),
            TraitAssignment::new("Mark Johnson", Dimension::Openness, Level::High),
            TraitAssignment::new("Mark Johnson", Dimension::Agreeableness, Level::Low),
        ];

        GraphBuilder::new()
            .with_entities(&entities)
            .with_relationships(&relationships)
            .with_traits(&traits)
            .build()
            .unwrap()
    }

    #[test]
    fn test_node_listing() {
        let graph = sample();
        let nodes = graph.nodes();

        assert_eq!(nodes.len(), 6);
        assert_eq!(graph.node_count(), 6);
        let trait_node = nodes
            .iter()
            .find(|n| n.id == "Mark Johnson::agreeableness")
            .unwrap();
        assert_eq!(trait_node.kind, NodeKind::Trait);
        assert_eq!(trait_node.label, "Agreeableness: low");
    }

    #[test]
    fn test_edge_listing() {
        let graph = sample();
        let edges = graph.edges();

        assert_eq!(edges.len(), 6);
        assert_eq!(
            edges.iter().filter(|e| e.kind == EdgeKind::HasTrait).count(),
            3
        );
        assert!(edges.contains(&EdgeView {
            source: "Mark Johnson".to_string(),
            target: "Sarah Chen".to_string(),
            kind: EdgeKind::Relation,
            label: "collaborates_with".to_string(),
        }));
    }

    #[test]
    fn test_cycles_are_allowed() {
        let graph = sample();
        assert!(petgraph::algo::is_cyclic_directed(graph.graph()));
    }

    #[test]
    fn test_traits_of() {
        let graph = sample();
        let traits = graph.traits_of("mark johnson");

        assert_eq!(traits.len(), 2);
        assert_eq!(traits[0].dimension, Dimension::Openness);
        assert_eq!(traits[1].level, Level::Low);
        assert!(graph.traits_of("Nobody").is_empty());
    }

    #[test]
    fn test_entities_with_trait() {
        let graph = sample();
        let ids: Vec<_> = graph
            .entities_with_trait(Dimension::Openness, Level::High)
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();

        assert_eq!(ids, vec!["Mark Johnson", "Sarah Chen"]);
        assert!(graph
            .entities_with_trait(Dimension::Neuroticism, Level::High)
            .is_empty());
    }

    #[test]
    fn test_relations_and_neighbors() {
        let graph = sample();

        let labels: Vec<_> = graph
            .relations_from("Sarah Chen")
            .into_iter()
            .map(|e| e.label)
            .collect();
        // sorted by target id
        assert_eq!(labels, vec!["manages", "works_at"]);

        assert_eq!(
            graph.neighbors("Sarah Chen"),
            vec!["Mark Johnson", "Sarah Chen::openness", "TechCorp"]
        );
    }

    #[test]
    fn test_node_lookup_is_case_insensitive() {
        let graph = sample();
        assert_eq!(
            graph.entity("techcorp").map(|e| e.kind),
            Some(EntityKind::Organization)
        );
        assert!(graph.contains("SARAH CHEN::OPENNESS"));
        assert!(graph.node("Unknown").is_none());
    }
}
