use std::collections::HashSet;
use std::time::{Duration, Instant};

use eframe::egui::Pos2;
use serde::Serialize;

use super::debounce::Debouncer;
use crate::graph::style::HighlightScheme;
use crate::graph::{GraphStore, NodeKind};
use crate::render::Renderer;
use crate::util::truncate_chars;

const TOOLTIP_DESCRIPTION_CHARS: usize = 160;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "node", rename_all = "lowercase")]
pub enum InteractionState {
    Idle,
    Hovering(String),
    Selected(String),
    /// Base styles restored, waiting for the renderer to pick them up.
    Resetting,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
    pub node_id: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: NodeKind,
    pub skill_count: Option<usize>,
    pub anchor: Pos2,
}

/// Hover tooltips plus the highlight/reset cycle over the whole graph.
#[derive(Debug)]
pub struct InteractionController {
    state: InteractionState,
    hover: Debouncer<String>,
    tooltip: Option<Tooltip>,
}

impl InteractionController {
    pub fn new(hover_delay: Duration) -> Self {
        Self {
            state: InteractionState::Idle,
            hover: Debouncer::new(hover_delay),
            tooltip: None,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn selected(&self) -> Option<&str> {
        match &self.state {
            InteractionState::Selected(id) => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn hover_deadline(&self) -> Option<Instant> {
        self.hover.deadline()
    }

    /// `allowed` is false while the camera moves or quality is low.
    pub fn pointer_enter(&mut self, id: String, now: Instant, allowed: bool) {
        if !allowed {
            return;
        }
        if self.state == InteractionState::Idle {
            self.state = InteractionState::Hovering(id.clone());
        }
        self.hover.trigger(now, id);
    }

    pub fn pointer_leave(&mut self) {
        self.hover.cancel();
        self.tooltip = None;
        if matches!(self.state, InteractionState::Hovering(_)) {
            self.state = InteractionState::Idle;
        }
    }

    pub fn poll_hover<R: Renderer + ?Sized>(
        &mut self,
        now: Instant,
        graph: &dyn GraphStore,
        renderer: &R,
    ) {
        let Some(id) = self.hover.poll(now) else {
            return;
        };
        let (Some(node), Some(display)) = (graph.node(&id), renderer.node_display_data(graph, &id))
        else {
            return;
        };

        self.tooltip = Some(Tooltip {
            node_id: node.id.clone(),
            label: node.label.clone(),
            description: node
                .description
                .as_deref()
                .map(|text| truncate_chars(text, TOOLTIP_DESCRIPTION_CHARS)),
            kind: node.kind,
            skill_count: node.skill_count,
            anchor: display.viewport,
        });
    }

    pub fn select(&mut self, graph: &mut dyn GraphStore, id: &str, scheme: &HighlightScheme) {
        if !graph.has_node(id) {
            return;
        }
        apply_highlight(graph, id, scheme);
        self.tooltip = None;
        self.state = InteractionState::Selected(id.to_owned());
    }

    pub fn begin_reset(&mut self, graph: &mut dyn GraphStore) {
        restore_base(graph);
        self.state = InteractionState::Resetting;
    }

    /// Called after the renderer has redrawn.
    pub fn settle(&mut self) {
        if self.state == InteractionState::Resetting {
            self.state = InteractionState::Idle;
        }
    }
}

/// Three-tier emphasis: `focus`, its neighbors, everything else.
pub fn apply_highlight(graph: &mut dyn GraphStore, focus: &str, scheme: &HighlightScheme) {
    let neighbors = graph.neighbors(focus).into_iter().collect::<HashSet<_>>();

    for node in graph.nodes_mut() {
        node.live = if node.id == focus {
            scheme.focus_style(&node.base)
        } else if neighbors.contains(&node.id) {
            scheme.neighbor_style(&node.base)
        } else {
            scheme.background_style(&node.base)
        };
    }

    for edge in graph.edges_mut() {
        edge.live = if edge.touches(focus) {
            scheme.connected_edge_style(&edge.base)
        } else {
            scheme.background_edge_style(&edge.base)
        };
    }
}

pub fn restore_base(graph: &mut dyn GraphStore) {
    for node in graph.nodes_mut() {
        node.restore_base();
    }
    for edge in graph.edges_mut() {
        edge.restore_base();
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::vec2;

    use super::*;
    use crate::graph::style::SKILL_COLOR;
    use crate::graph::{EdgeData, EdgeKind, EdgeSpec, MemoryGraph, NodeData, NodeSpec, NodeStyle};
    use crate::render::HeadlessRenderer;

    fn star() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        let specs = [
            ("occ", NodeKind::Occupation),
            ("s1", NodeKind::Skill),
            ("s2", NodeKind::Skill),
            ("far", NodeKind::Skill),
        ];
        for (id, kind) in specs {
            graph.add_node(NodeData::from(NodeSpec {
                id: id.to_owned(),
                label: format!("{id} label"),
                description: Some("long description ".repeat(20)),
                kind,
                size: 6.0,
                skill_count: Some(3),
            }));
        }
        for (source, target) in [("s1", "occ"), ("s2", "occ"), ("far", "s2")] {
            graph
                .add_edge(EdgeData::from(EdgeSpec {
                    source: source.to_owned(),
                    target: target.to_owned(),
                    kind: EdgeKind::Essential,
                }))
                .unwrap();
        }
        graph
    }

    fn live_styles(graph: &MemoryGraph) -> Vec<NodeStyle> {
        graph.nodes().map(|node| node.live).collect()
    }

    #[test]
    fn highlight_tiers_cover_the_whole_graph() {
        let mut graph = star();
        apply_highlight(&mut graph, "occ", &HighlightScheme::click());

        let style = |id: &str| graph.node(id).map(|node| node.live).unwrap();
        assert_eq!(style("occ").z_index, 100);
        assert_eq!(style("occ").size, 9.0);
        assert_eq!(style("s1").color, SKILL_COLOR);
        assert_eq!(style("s1").z_index, 50);
        assert!(!style("far").label_visible);
        assert_eq!(style("far").z_index, 0);

        assert_eq!(graph.edge("s1->occ").map(|e| e.live.z_index), Some(75));
        assert_eq!(graph.edge("far->s2").map(|e| e.live.z_index), Some(0));
    }

    #[test]
    fn repeated_highlights_do_not_compound() {
        let mut graph = star();
        apply_highlight(&mut graph, "occ", &HighlightScheme::click());
        let once = live_styles(&graph);
        apply_highlight(&mut graph, "occ", &HighlightScheme::click());
        assert_eq!(live_styles(&graph), once);
    }

    #[test]
    fn reset_restores_every_base_style() {
        let mut graph = star();
        let before = live_styles(&graph);
        let mut controller = InteractionController::new(Duration::from_millis(100));

        controller.select(&mut graph, "s2", &HighlightScheme::search());
        assert_eq!(controller.selected(), Some("s2"));
        controller.begin_reset(&mut graph);
        assert_eq!(controller.state(), &InteractionState::Resetting);
        controller.settle();

        assert_eq!(live_styles(&graph), before);
        assert!(graph.edges().all(|edge| edge.live == edge.base));
        assert_eq!(controller.state(), &InteractionState::Idle);
    }

    #[test]
    fn hover_tooltip_waits_for_debounce_and_leave_cancels() {
        let graph = star();
        let mut renderer = HeadlessRenderer::new(vec2(800.0, 600.0));
        crate::render::Renderer::refresh(&mut renderer, &graph).unwrap();
        let mut controller = InteractionController::new(Duration::from_millis(100));
        let start = Instant::now();

        controller.pointer_enter("occ".to_owned(), start, true);
        assert_eq!(controller.state(), &InteractionState::Hovering("occ".to_owned()));
        controller.poll_hover(start + Duration::from_millis(50), &graph, &renderer);
        assert!(controller.tooltip().is_none());

        controller.poll_hover(start + Duration::from_millis(100), &graph, &renderer);
        let tooltip = controller.tooltip().unwrap();
        assert_eq!(tooltip.label, "occ label");
        assert!(tooltip.description.as_deref().unwrap().ends_with('…'));

        controller.pointer_leave();
        assert!(controller.tooltip().is_none());
        assert_eq!(controller.state(), &InteractionState::Idle);
    }

    #[test]
    fn blocked_hover_is_ignored() {
        let mut controller = InteractionController::new(Duration::from_millis(100));
        controller.pointer_enter("occ".to_owned(), Instant::now(), false);
        assert_eq!(controller.state(), &InteractionState::Idle);
        assert!(controller.hover_deadline().is_none());
    }
}
