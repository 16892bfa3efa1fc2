use std::time::Instant;

use eframe::egui::{self, Align, Context, Layout};

use taxonomy_explorer::engine::Engine;
use taxonomy_explorer::util::format_count;

use super::super::canvas::CanvasRenderer;
use super::super::Explorer;

impl Explorer {
    pub(in crate::app) fn new(engine: Engine<CanvasRenderer>) -> Self {
        Self {
            engine,
            search_query: String::new(),
            search_status: None,
            load_status: None,
            fps: Default::default(),
        }
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        let now = Instant::now();
        self.fps.update(ctx);
        self.engine.tick(now);

        let stats = self.engine.stats();
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Taxonomy Explorer");
                    ui.separator();
                    ui.label(format!("nodes: {}", format_count(stats.nodes)));
                    ui.label(format!("edges: {}", format_count(stats.edges)));
                    ui.label(format!(
                        "skills: {} / {}",
                        format_count(stats.skills_loaded),
                        format_count(stats.skills_total)
                    ));
                    ui.label(format!("quality: {}", stats.quality.label()));
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(fps_text) = self.fps.display_text() {
                            ui.label(fps_text);
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui, now));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_details(ui, now));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.engine.renderer_mut().show(ui);
            });
        self.draw_tooltip(ctx);

        if self.engine.is_busy() || self.engine.renderer().has_pending_events() {
            ctx.request_repaint();
        } else if let Some(wakeup) = self.engine.next_wakeup() {
            ctx.request_repaint_after(wakeup.saturating_duration_since(now));
        }
    }
}
