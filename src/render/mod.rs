mod headless;

use std::time::Duration;

use eframe::egui::{Pos2, Vec2, pos2, vec2};
use thiserror::Error;

use crate::graph::GraphStore;

pub use headless::HeadlessRenderer;

/// Camera over the framed unit square: `(0.5, 0.5)` at ratio 1 shows the
/// whole graph. Smaller ratios zoom in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub x: f32,
    pub y: f32,
    pub ratio: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            ratio: 1.0,
        }
    }
}

impl Camera {
    pub fn center(self) -> Pos2 {
        pos2(self.x, self.y)
    }

    pub fn framed_to_viewport(self, framed: Pos2, container: Vec2) -> Pos2 {
        let scale = container.x.min(container.y).max(1.0) / self.ratio.max(f32::EPSILON);
        let offset = (framed - self.center()) * scale;
        pos2(container.x * 0.5 + offset.x, container.y * 0.5 + offset.y)
    }

    pub fn viewport_to_framed(self, viewport: Pos2, container: Vec2) -> Pos2 {
        let scale = container.x.min(container.y).max(1.0) / self.ratio.max(f32::EPSILON);
        let offset = (viewport - pos2(container.x * 0.5, container.y * 0.5)) / scale;
        self.center() + offset
    }

    /// Blend towards `target` by `t` in `[0, 1]`.
    pub fn lerp(self, target: CameraTarget, t: f32) -> Self {
        let x = target.x.unwrap_or(self.x);
        let y = target.y.unwrap_or(self.y);
        let ratio = target.ratio.unwrap_or(self.ratio);
        if t >= 1.0 {
            return Self { x, y, ratio };
        }

        let t = t.max(0.0);
        let eased = t * t * (3.0 - 2.0 * t);
        Self {
            x: self.x + (x - self.x) * eased,
            y: self.y + (y - self.y) * eased,
            ratio: self.ratio + (ratio - self.ratio) * eased,
        }
    }
}

/// Partial camera state to animate towards; `None` keeps the current value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraTarget {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub ratio: Option<f32>,
}

impl CameraTarget {
    pub fn ratio(ratio: f32) -> Self {
        Self {
            ratio: Some(ratio),
            ..Self::default()
        }
    }

    pub fn at(point: Pos2, ratio: f32) -> Self {
        Self {
            x: Some(point.x),
            y: Some(point.y),
            ratio: Some(ratio),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    pub render_labels: bool,
    pub hide_labels_on_move: bool,
    pub label_size: f32,
    pub hide_edges_on_move: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            render_labels: true,
            hide_labels_on_move: false,
            label_size: 10.0,
            hide_edges_on_move: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeDisplay {
    pub framed: Pos2,
    pub viewport: Pos2,
    pub size: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RendererEvent {
    EnterNode(String),
    LeaveNode(String),
    ClickNode(String),
    ClickStage,
    CameraUpdated { ratio: f32 },
}

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("renderer refresh failed: {0}")]
    Refresh(String),
    #[error("container still has no size after {attempts} attempts")]
    ContainerNotSized { attempts: u32 },
}

/// Draws a `GraphStore` and reports pointer and camera activity.
pub trait Renderer {
    fn container_size(&self) -> Vec2;
    fn camera(&self) -> Camera;
    fn animate_camera(&mut self, target: CameraTarget, duration: Duration);
    fn node_display_data(&self, graph: &dyn GraphStore, id: &str) -> Option<NodeDisplay>;
    fn apply_settings(&mut self, settings: RenderSettings);
    fn settings(&self) -> RenderSettings;
    /// Re-read positions and styles from `graph`.
    fn refresh(&mut self, graph: &dyn GraphStore) -> Result<(), RenderError>;
    fn drain_events(&mut self) -> Vec<RendererEvent>;

    fn has_size(&self) -> bool {
        let size = self.container_size();
        size.x > 0.0 && size.y > 0.0
    }
}

/// Maps graph positions into the unit square, preserving aspect ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Framing {
    origin: Vec2,
    extent: f32,
}

impl Default for Framing {
    fn default() -> Self {
        Self {
            origin: vec2(-0.5, -0.5),
            extent: 1.0,
        }
    }
}

impl Framing {
    pub fn of(graph: &dyn GraphStore) -> Self {
        let mut nodes = graph.nodes();
        let Some(first) = nodes.next() else {
            return Self::default();
        };

        let (min, max) = nodes.fold((first.position, first.position), |(min, max), node| {
            (min.min(node.position), max.max(node.position))
        });
        let span = max - min;
        let extent = span.x.max(span.y).max(1.0);
        let center = (min + max) * 0.5;
        Self {
            origin: center - Vec2::splat(extent * 0.5),
            extent,
        }
    }

    pub fn frame(self, position: Vec2) -> Pos2 {
        ((position - self.origin) / self.extent).to_pos2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_centres_the_frame() {
        let camera = Camera::default();
        let container = vec2(800.0, 600.0);
        assert_eq!(
            camera.framed_to_viewport(pos2(0.5, 0.5), container),
            pos2(400.0, 300.0)
        );

        let back = camera.viewport_to_framed(pos2(100.0, 50.0), container);
        let again = camera.framed_to_viewport(back, container);
        assert!((again - pos2(100.0, 50.0)).length() < 0.001);
    }

    #[test]
    fn lerp_reaches_target_and_keeps_unset_axes() {
        let camera = Camera::default();
        let done = camera.lerp(CameraTarget::ratio(0.2), 1.0);
        assert_eq!(done, Camera { ratio: 0.2, ..camera });
        assert_eq!(camera.lerp(CameraTarget::ratio(0.2), 0.0), camera);
    }
}
