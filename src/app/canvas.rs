use std::collections::HashMap;
use std::time::{Duration, Instant};

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2, vec2};

use taxonomy_explorer::config::CameraConfig;
use taxonomy_explorer::graph::{EdgeStyle, GraphStore, NodeStyle};
use taxonomy_explorer::render::{
    Camera, CameraTarget, Framing, NodeDisplay, RenderError, RenderSettings, Renderer,
    RendererEvent,
};

use super::render_utils::{circle_visible, draw_background, edge_visible, screen_radius, to_screen};

const LABEL_COLOR: Color32 = Color32::from_rgb(31, 41, 55);
const HOVER_RING: Color32 = Color32::from_rgb(17, 24, 39);

struct DrawNode {
    id: String,
    label: String,
    framed: Pos2,
    style: NodeStyle,
}

struct DrawEdge {
    source: usize,
    target: usize,
    style: EdgeStyle,
}

struct CameraAnimation {
    from: Camera,
    target: CameraTarget,
    started: Instant,
    duration: Duration,
}

/// Draws a snapshot of the graph taken at the last refresh onto an egui canvas.
pub struct CanvasRenderer {
    limits: CameraConfig,
    rect: Rect,
    camera: Camera,
    animation: Option<CameraAnimation>,
    settings: RenderSettings,
    framing: Framing,
    nodes: Vec<DrawNode>,
    edges: Vec<DrawEdge>,
    node_order: Vec<usize>,
    edge_order: Vec<usize>,
    hovered: Option<usize>,
    events: Vec<RendererEvent>,
}

impl Default for CanvasRenderer {
    fn default() -> Self {
        Self {
            limits: CameraConfig::default(),
            rect: Rect::ZERO,
            camera: Camera::default(),
            animation: None,
            settings: RenderSettings::default(),
            framing: Framing::default(),
            nodes: Vec::new(),
            edges: Vec::new(),
            node_order: Vec::new(),
            edge_order: Vec::new(),
            hovered: None,
            events: Vec::new(),
        }
    }
}

impl CanvasRenderer {
    pub fn new(limits: CameraConfig) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.events.push(RendererEvent::CameraUpdated {
            ratio: camera.ratio,
        });
    }

    fn advance_animation(&mut self) -> bool {
        let Some(animation) = &self.animation else {
            return false;
        };

        let elapsed = animation.started.elapsed().as_secs_f32();
        let t = if animation.duration.is_zero() {
            1.0
        } else {
            elapsed / animation.duration.as_secs_f32()
        };
        let camera = animation.from.lerp(animation.target, t);
        if t >= 1.0 {
            self.animation = None;
        }
        self.set_camera(camera);
        true
    }

    fn scrolled_ratio(&self, scroll: f32) -> f32 {
        let factor = (1.0 - scroll * 0.0018).clamp(0.85, 1.15);
        self.limits.clamp_ratio(self.camera.ratio * factor)
    }

    fn handle_zoom(&mut self, ui: &Ui, response: &egui::Response) -> bool {
        if !response.hovered() {
            return false;
        }
        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return false;
        }

        let size = self.rect.size();
        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| self.rect.center());
        let local = (pointer - self.rect.min).to_pos2();
        let anchor = self.camera.viewport_to_framed(local, size);

        let mut camera = Camera {
            ratio: self.scrolled_ratio(scroll),
            ..self.camera
        };
        let drift = anchor - camera.viewport_to_framed(local, size);
        camera.x += drift.x;
        camera.y += drift.y;

        self.animation = None;
        self.set_camera(camera);
        true
    }

    fn handle_pan(&mut self, response: &egui::Response) -> bool {
        if !response.dragged() {
            return false;
        }
        let delta = response.drag_delta();
        if delta == Vec2::ZERO {
            return true;
        }

        let scale = self.rect.width().min(self.rect.height()).max(1.0) / self.camera.ratio;
        let camera = Camera {
            x: self.camera.x - delta.x / scale,
            y: self.camera.y - delta.y / scale,
            ..self.camera
        };
        self.animation = None;
        self.set_camera(camera);
        true
    }

    fn hit_test(&self, pointer: Pos2, screen: &[Pos2], radii: &[f32]) -> Option<usize> {
        self.node_order
            .iter()
            .rev()
            .copied()
            .filter(|&index| screen[index].distance(pointer) <= radii[index].max(4.0))
            .min_by(|&a, &b| {
                screen[a]
                    .distance(pointer)
                    .total_cmp(&screen[b].distance(pointer))
            })
    }

    fn update_hover(&mut self, hovered: Option<usize>) {
        if hovered == self.hovered {
            return;
        }
        if let Some(previous) = self.hovered.and_then(|index| self.nodes.get(index)) {
            self.events
                .push(RendererEvent::LeaveNode(previous.id.clone()));
        }
        if let Some(next) = hovered.and_then(|index| self.nodes.get(index)) {
            self.events.push(RendererEvent::EnterNode(next.id.clone()));
        }
        self.hovered = hovered;
    }

    pub fn show(&mut self, ui: &mut Ui) -> egui::Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        self.rect = rect;
        let painter = ui.painter_at(rect);

        let mut moving = self.advance_animation();
        moving |= self.handle_zoom(ui, &response);
        moving |= self.handle_pan(&response);

        draw_background(&painter, rect, self.camera);

        let camera = self.camera;
        let screen = self
            .nodes
            .iter()
            .map(|node| to_screen(rect, camera, node.framed))
            .collect::<Vec<_>>();
        let radii = self
            .nodes
            .iter()
            .map(|node| screen_radius(node.style.size, camera))
            .collect::<Vec<_>>();

        let hovered = if response.dragged() {
            self.hovered
        } else {
            response
                .hover_pos()
                .and_then(|pointer| self.hit_test(pointer, &screen, &radii))
        };
        self.update_hover(hovered);

        if response.clicked() {
            let event = match hovered.and_then(|index| self.nodes.get(index)) {
                Some(node) => RendererEvent::ClickNode(node.id.clone()),
                None => RendererEvent::ClickStage,
            };
            self.events.push(event);
        }

        if !(moving && self.settings.hide_edges_on_move) {
            for &index in &self.edge_order {
                let edge = &self.edges[index];
                let (start, end) = (screen[edge.source], screen[edge.target]);
                if edge_visible(rect, start, end) {
                    painter.line_segment([start, end], Stroke::new(edge.style.size, edge.style.color));
                }
            }
        }

        let labels = self.settings.render_labels && !(moving && self.settings.hide_labels_on_move);
        let font = FontId::proportional(self.settings.label_size);
        for &index in &self.node_order {
            let node = &self.nodes[index];
            let (position, radius) = (screen[index], radii[index]);
            if !circle_visible(rect, position, radius) {
                continue;
            }

            painter.circle_filled(position, radius, node.style.color);
            let is_hovered = hovered == Some(index);
            if is_hovered {
                painter.circle_stroke(position, radius + 2.0, Stroke::new(1.5, HOVER_RING));
            }

            let prominent = node.style.z_index > 1 || radius >= 7.0 || is_hovered;
            if labels && node.style.label_visible && prominent {
                painter.text(
                    position + vec2(radius + 4.0, 0.0),
                    Align2::LEFT_CENTER,
                    &node.label,
                    font.clone(),
                    LABEL_COLOR,
                );
            }
        }

        if moving {
            ui.ctx().request_repaint();
        }
        response
    }
}

impl Renderer for CanvasRenderer {
    fn container_size(&self) -> Vec2 {
        self.rect.size()
    }

    fn camera(&self) -> Camera {
        self.camera
    }

    fn animate_camera(&mut self, target: CameraTarget, duration: Duration) {
        self.animation = Some(CameraAnimation {
            from: self.camera,
            target,
            started: Instant::now(),
            duration,
        });
    }

    fn node_display_data(&self, graph: &dyn GraphStore, id: &str) -> Option<NodeDisplay> {
        let node = graph.node(id)?;
        let framed = self.framing.frame(node.position);
        Some(NodeDisplay {
            framed,
            viewport: self.camera.framed_to_viewport(framed, self.rect.size()),
            size: screen_radius(node.live.size, self.camera),
        })
    }

    fn apply_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }

    fn settings(&self) -> RenderSettings {
        self.settings
    }

    fn refresh(&mut self, graph: &dyn GraphStore) -> Result<(), RenderError> {
        self.framing = Framing::of(graph);
        let hovered_id = self
            .hovered
            .and_then(|index| self.nodes.get(index))
            .map(|node| node.id.clone());

        let mut index_by_id = HashMap::with_capacity(graph.node_count());
        self.nodes = graph
            .nodes()
            .enumerate()
            .map(|(index, node)| {
                index_by_id.insert(node.id.clone(), index);
                DrawNode {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    framed: self.framing.frame(node.position),
                    style: node.live,
                }
            })
            .collect();

        let mut edges = Vec::with_capacity(graph.edge_count());
        for edge in graph.edges() {
            let (Some(&source), Some(&target)) =
                (index_by_id.get(&edge.source), index_by_id.get(&edge.target))
            else {
                return Err(RenderError::Refresh(format!(
                    "edge {} has no drawable endpoint",
                    edge.id
                )));
            };
            edges.push(DrawEdge {
                source,
                target,
                style: edge.live,
            });
        }
        self.edges = edges;

        self.node_order = (0..self.nodes.len()).collect();
        self.node_order
            .sort_by_key(|&index| self.nodes[index].style.z_index);
        self.edge_order = (0..self.edges.len()).collect();
        self.edge_order
            .sort_by_key(|&index| self.edges[index].style.z_index);

        self.hovered = hovered_id.and_then(|id| index_by_id.get(&id).copied());
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<RendererEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_zoom_respects_configured_limits() {
        let mut canvas = CanvasRenderer::new(CameraConfig {
            min_ratio: 0.5,
            max_ratio: 2.0,
        });
        canvas.camera.ratio = 1.9;
        assert_eq!(canvas.scrolled_ratio(-500.0), 2.0);

        canvas.camera.ratio = 0.55;
        assert_eq!(canvas.scrolled_ratio(500.0), 0.5);

        canvas.camera.ratio = 1.0;
        assert!((canvas.scrolled_ratio(50.0) - 0.91).abs() < 1e-6);
    }
}
