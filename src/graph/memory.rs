use std::collections::{HashMap, HashSet};

use super::{EdgeData, GraphError, GraphStore, NodeData};

/// In-memory `GraphStore` with index maps and per-node incidence lists.
#[derive(Default)]
pub struct MemoryGraph {
    nodes: Vec<NodeData>,
    node_index: HashMap<String, usize>,
    edges: Vec<EdgeData>,
    edge_index: HashMap<String, usize>,
    incidence: Vec<Vec<usize>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemoryGraph {
    fn add_node(&mut self, node: NodeData) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        self.incidence.push(Vec::new());
        true
    }

    fn add_edge(&mut self, edge: EdgeData) -> Result<bool, GraphError> {
        if self.edge_index.contains_key(&edge.id) {
            return Ok(false);
        }

        let endpoint = |id: &str| {
            self.node_index
                .get(id)
                .copied()
                .ok_or_else(|| GraphError::MissingEndpoint {
                    edge: edge.id.clone(),
                    node: id.to_owned(),
                })
        };
        let source = endpoint(&edge.source)?;
        let target = endpoint(&edge.target)?;

        let index = self.edges.len();
        self.edge_index.insert(edge.id.clone(), index);
        self.edges.push(edge);
        self.incidence[source].push(index);
        if target != source {
            self.incidence[target].push(index);
        }
        Ok(true)
    }

    fn has_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    fn has_edge(&self, id: &str) -> bool {
        self.edge_index.contains_key(id)
    }

    fn node(&self, id: &str) -> Option<&NodeData> {
        self.node_index.get(id).map(|&index| &self.nodes[index])
    }

    fn edge(&self, id: &str) -> Option<&EdgeData> {
        self.edge_index.get(id).map(|&index| &self.edges[index])
    }

    fn nodes(&self) -> Box<dyn Iterator<Item = &NodeData> + '_> {
        Box::new(self.nodes.iter())
    }

    fn nodes_mut(&mut self) -> Box<dyn Iterator<Item = &mut NodeData> + '_> {
        Box::new(self.nodes.iter_mut())
    }

    fn edges(&self) -> Box<dyn Iterator<Item = &EdgeData> + '_> {
        Box::new(self.edges.iter())
    }

    fn edges_mut(&mut self) -> Box<dyn Iterator<Item = &mut EdgeData> + '_> {
        Box::new(self.edges.iter_mut())
    }

    fn neighbors(&self, id: &str) -> Vec<String> {
        let Some(&index) = self.node_index.get(id) else {
            return Vec::new();
        };

        let mut seen = HashSet::with_capacity(self.incidence[index].len());
        let mut out = Vec::new();
        for &edge_index in &self.incidence[index] {
            let edge = &self.edges[edge_index];
            let other = if edge.source == id {
                edge.target.as_str()
            } else {
                edge.source.as_str()
            };
            if other != id && seen.insert(other) {
                out.push(other.to_owned());
            }
        }
        out
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeKind, EdgeSpec, NodeKind, NodeSpec};

    fn node(id: &str, kind: NodeKind) -> NodeData {
        NodeData::from(NodeSpec {
            id: id.to_owned(),
            label: id.to_owned(),
            description: None,
            kind,
            size: 5.0,
            skill_count: None,
        })
    }

    fn edge(source: &str, target: &str) -> EdgeData {
        EdgeData::from(EdgeSpec {
            source: source.to_owned(),
            target: target.to_owned(),
            kind: EdgeKind::Optional,
        })
    }

    #[test]
    fn duplicate_ids_are_ignored() {
        let mut graph = MemoryGraph::new();
        assert!(graph.add_node(node("a", NodeKind::Skill)));
        assert!(!graph.add_node(node("a", NodeKind::Occupation)));
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node("a").map(|n| n.kind), Some(NodeKind::Skill));
    }

    #[test]
    fn edges_require_both_endpoints() {
        let mut graph = MemoryGraph::new();
        graph.add_node(node("a", NodeKind::Skill));

        let err = graph.add_edge(edge("a", "b")).unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingEndpoint {
                edge: "a->b".to_owned(),
                node: "b".to_owned(),
            }
        );
        assert_eq!(graph.edge_count(), 0);

        graph.add_node(node("b", NodeKind::Occupation));
        assert_eq!(graph.add_edge(edge("a", "b")), Ok(true));
        assert_eq!(graph.add_edge(edge("a", "b")), Ok(false));
        assert!(graph.has_edge("a->b"));
    }

    #[test]
    fn neighbors_cover_both_directions_once() {
        let mut graph = MemoryGraph::new();
        for id in ["a", "b", "c"] {
            graph.add_node(node(id, NodeKind::Skill));
        }
        graph.add_edge(edge("a", "b")).unwrap();
        graph.add_edge(edge("b", "a")).unwrap();
        graph.add_edge(edge("c", "a")).unwrap();

        let mut neighbors = graph.neighbors("a");
        neighbors.sort();
        assert_eq!(neighbors, vec!["b".to_owned(), "c".to_owned()]);
        assert!(graph.neighbors("missing").is_empty());
    }

    #[test]
    fn hub_neighbors_are_listed_once_each() {
        let mut graph = MemoryGraph::new();
        graph.add_node(node("hub", NodeKind::Occupation));
        for index in 0..200 {
            let id = format!("s{index}");
            graph.add_node(node(&id, NodeKind::Skill));
            graph.add_edge(edge(&id, "hub")).unwrap();
            graph.add_edge(edge("hub", &id)).unwrap();
        }

        let neighbors = graph.neighbors("hub");
        assert_eq!(neighbors.len(), 200);
        assert_eq!(neighbors.first().map(String::as_str), Some("s0"));
        assert_eq!(graph.neighbors("s7"), vec!["hub".to_owned()]);
    }

    #[test]
    fn kinds_are_counted_once_per_id() {
        let mut graph = MemoryGraph::new();
        graph.add_node(node("a", NodeKind::Group));
        graph.add_node(node("a", NodeKind::Group));
        assert_eq!(graph.count_kind(NodeKind::Group), 1);
    }
}
