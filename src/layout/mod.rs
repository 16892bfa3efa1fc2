mod quadtree;

use std::collections::HashMap;

use eframe::egui::Vec2;
use tracing::debug;

use crate::graph::GraphStore;

use quadtree::{QuadNode, Repulsion};

/// Assigns positions to every node of a graph in place.
pub trait Layout {
    fn assign(&mut self, graph: &mut dyn GraphStore, iterations: usize);
}

/// Fruchterman-Reingold style placement with Barnes-Hut repulsion.
///
/// Runs a fixed number of cooling steps from the current positions, so a
/// pass after a small insertion mostly keeps earlier nodes in place.
#[derive(Clone, Debug)]
pub struct ForceLayout {
    pub theta: f32,
    pub spring: f32,
    pub gravity: f32,
    pub cooling: f32,
}

impl Default for ForceLayout {
    fn default() -> Self {
        Self {
            theta: 0.72,
            spring: 0.18,
            gravity: 0.0012,
            cooling: 0.965,
        }
    }
}

impl Layout for ForceLayout {
    fn assign(&mut self, graph: &mut dyn GraphStore, iterations: usize) {
        let mut index = HashMap::with_capacity(graph.node_count());
        let mut positions = Vec::with_capacity(graph.node_count());
        let mut radii = Vec::with_capacity(graph.node_count());
        for node in graph.nodes() {
            index.insert(node.id.clone(), positions.len());
            positions.push(node.position);
            radii.push(node.base.size);
        }

        let edges = graph
            .edges()
            .filter_map(|edge| Some((*index.get(&edge.source)?, *index.get(&edge.target)?)))
            .collect::<Vec<_>>();

        self.simulate(&mut positions, &edges, &radii, iterations);

        for node in graph.nodes_mut() {
            if let Some(&i) = index.get(&node.id) {
                node.position = positions[i];
            }
        }
        debug!(
            nodes = positions.len(),
            edges = edges.len(),
            iterations,
            "layout pass finished"
        );
    }
}

impl ForceLayout {
    fn simulate(
        &self,
        positions: &mut [Vec2],
        edges: &[(usize, usize)],
        radii: &[f32],
        iterations: usize,
    ) {
        let n = positions.len();
        if n < 2 || iterations == 0 {
            return;
        }

        let area = ((n as f32).sqrt() * 120.0).powi(2);
        let k = (area / n as f32).sqrt().max(24.0);
        let repulsion = Repulsion {
            strength: k * k * k,
            softening: 1.0,
            theta: self.theta,
        };
        let mut temperature = k * 2.0;

        for _ in 0..iterations {
            let Some(tree) = QuadNode::build(positions) else {
                return;
            };

            let mut disp = (0..n)
                .map(|i| repulsion.accumulate(&tree, i, positions))
                .collect::<Vec<_>>();

            for &(from, to) in edges {
                if from == to {
                    continue;
                }
                let delta = positions[from] - positions[to];
                let distance = delta.length().max(0.5);
                let ideal = k + (radii[from] + radii[to]) * 3.5;
                let pull = delta / distance * (distance - ideal) * self.spring;
                disp[from] -= pull;
                disp[to] += pull;
            }

            for (position, d) in positions.iter_mut().zip(disp.iter_mut()) {
                *d -= *position * self.gravity;
                let length = d.length();
                if length > 0.0 && length.is_finite() {
                    *position += *d / length * length.min(temperature);
                }
            }

            temperature *= self.cooling;
        }
    }
}
