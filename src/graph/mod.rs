mod memory;
pub mod style;

use eframe::egui::{Color32, Vec2};
use serde::Serialize;
use thiserror::Error;

use crate::dataset::RelationType;
use crate::util::stable_pair;

pub use memory::MemoryGraph;

/// Radius of the square initial positions are scattered over.
pub const INITIAL_SPREAD: f32 = 500.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Occupation,
    Skill,
    Group,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Occupation => "Occupation",
            NodeKind::Skill => "Skill",
            NodeKind::Group => "Group",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Essential,
    Optional,
    Hierarchy,
}

impl From<RelationType> for EdgeKind {
    fn from(value: RelationType) -> Self {
        match value {
            RelationType::Essential => EdgeKind::Essential,
            RelationType::Optional => EdgeKind::Optional,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
    pub color: Color32,
    pub size: f32,
    pub z_index: i32,
    pub label_visible: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeStyle {
    pub color: Color32,
    pub size: f32,
    pub z_index: i32,
}

/// A node as the builder describes it, before it lands in a store.
#[derive(Clone, Debug)]
pub struct NodeSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: NodeKind,
    pub size: f32,
    pub skill_count: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct NodeData {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: NodeKind,
    pub skill_count: Option<usize>,
    pub position: Vec2,
    /// Style assigned at insertion; restored on every reset.
    pub base: NodeStyle,
    pub live: NodeStyle,
}

impl From<NodeSpec> for NodeData {
    fn from(spec: NodeSpec) -> Self {
        let (x, y) = stable_pair(&spec.id);
        let base = style::node_base_style(spec.kind, spec.size);
        Self {
            position: Vec2::new(x, y) * INITIAL_SPREAD,
            id: spec.id,
            label: spec.label,
            description: spec.description,
            kind: spec.kind,
            skill_count: spec.skill_count,
            base,
            live: base,
        }
    }
}

impl NodeData {
    pub fn restore_base(&mut self) {
        self.live = self.base;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl EdgeSpec {
    pub fn key(&self) -> String {
        edge_key(&self.source, &self.target)
    }
}

#[derive(Clone, Debug)]
pub struct EdgeData {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub base: EdgeStyle,
    pub live: EdgeStyle,
}

impl From<EdgeSpec> for EdgeData {
    fn from(spec: EdgeSpec) -> Self {
        let base = style::edge_base_style(spec.kind);
        Self {
            id: spec.key(),
            source: spec.source,
            target: spec.target,
            kind: spec.kind,
            base,
            live: base,
        }
    }
}

impl EdgeData {
    pub fn restore_base(&mut self) {
        self.live = self.base;
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

pub fn edge_key(source: &str, target: &str) -> String {
    format!("{source}->{target}")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("edge {edge} references missing node {node}")]
    MissingEndpoint { edge: String, node: String },
}

/// Mutable graph of styled nodes and edges, keyed by id.
///
/// Insertions of an existing id are ignored and report `false`.
pub trait GraphStore {
    fn add_node(&mut self, node: NodeData) -> bool;
    /// Both endpoints must already exist.
    fn add_edge(&mut self, edge: EdgeData) -> Result<bool, GraphError>;

    fn has_node(&self, id: &str) -> bool;
    fn has_edge(&self, id: &str) -> bool;

    fn node(&self, id: &str) -> Option<&NodeData>;
    fn edge(&self, id: &str) -> Option<&EdgeData>;

    fn nodes(&self) -> Box<dyn Iterator<Item = &NodeData> + '_>;
    fn nodes_mut(&mut self) -> Box<dyn Iterator<Item = &mut NodeData> + '_>;
    fn edges(&self) -> Box<dyn Iterator<Item = &EdgeData> + '_>;
    fn edges_mut(&mut self) -> Box<dyn Iterator<Item = &mut EdgeData> + '_>;

    /// Ids adjacent to `id` in either direction, without duplicates.
    fn neighbors(&self, id: &str) -> Vec<String>;

    fn node_count(&self) -> usize;
    fn edge_count(&self) -> usize;

    fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes().filter(|node| node.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_nodes_start_at_base_style_and_stable_position() {
        let spec = NodeSpec {
            id: "occ-1".to_owned(),
            label: "Welder".to_owned(),
            description: None,
            kind: NodeKind::Occupation,
            size: 12.0,
            skill_count: Some(24),
        };
        let first = NodeData::from(spec.clone());
        let second = NodeData::from(spec);

        assert_eq!(first.base, first.live);
        assert_eq!(first.base.color, style::OCCUPATION_COLOR);
        assert_eq!(first.position, second.position);
        assert!(first.position.x.abs() <= INITIAL_SPREAD);
    }

    #[test]
    fn edge_ids_join_endpoints() {
        let edge = EdgeData::from(EdgeSpec {
            source: "skill-1".to_owned(),
            target: "occ-2".to_owned(),
            kind: EdgeKind::Essential,
        });
        assert_eq!(edge.id, "skill-1->occ-2");
        assert!(edge.touches("occ-2"));
        assert_eq!(edge.base.color, style::ESSENTIAL_EDGE_COLOR);
    }
}
