use std::collections::VecDeque;
use std::time::Duration;

use eframe::egui::Vec2;

use super::{
    Camera, CameraTarget, Framing, NodeDisplay, RenderError, RenderSettings, Renderer,
    RendererEvent,
};
use crate::graph::GraphStore;

/// Renderer without a window. Camera animations complete instantly and
/// pointer activity is injected with `push_event`.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    size: Vec2,
    camera: Camera,
    settings: RenderSettings,
    framing: Framing,
    events: VecDeque<RendererEvent>,
    animations: Vec<(CameraTarget, Duration)>,
    refreshes: usize,
    failing_refreshes: usize,
}

impl HeadlessRenderer {
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    /// Make the next `count` refreshes fail.
    pub fn fail_refreshes(&mut self, count: usize) {
        self.failing_refreshes = count;
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }

    pub fn animations(&self) -> &[(CameraTarget, Duration)] {
        &self.animations
    }

    pub fn push_event(&mut self, event: RendererEvent) {
        self.events.push_back(event);
    }

    /// Simulates a user zoom gesture.
    pub fn zoom_to(&mut self, ratio: f32) {
        self.camera.ratio = ratio;
        self.events.push_back(RendererEvent::CameraUpdated { ratio });
    }
}

impl Renderer for HeadlessRenderer {
    fn container_size(&self) -> Vec2 {
        self.size
    }

    fn camera(&self) -> Camera {
        self.camera
    }

    fn animate_camera(&mut self, target: CameraTarget, duration: Duration) {
        self.camera = self.camera.lerp(target, 1.0);
        self.animations.push((target, duration));
        self.events.push_back(RendererEvent::CameraUpdated {
            ratio: self.camera.ratio,
        });
    }

    fn node_display_data(&self, graph: &dyn GraphStore, id: &str) -> Option<NodeDisplay> {
        let node = graph.node(id)?;
        let framed = self.framing.frame(node.position);
        Some(NodeDisplay {
            framed,
            viewport: self.camera.framed_to_viewport(framed, self.size),
            size: node.live.size,
        })
    }

    fn apply_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }

    fn settings(&self) -> RenderSettings {
        self.settings
    }

    fn refresh(&mut self, graph: &dyn GraphStore) -> Result<(), RenderError> {
        if self.failing_refreshes > 0 {
            self.failing_refreshes -= 1;
            return Err(RenderError::Refresh("injected failure".to_owned()));
        }
        self.framing = Framing::of(graph);
        self.refreshes += 1;
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<RendererEvent> {
        self.events.drain(..).collect()
    }
}
