use std::time::Instant;

use eframe::egui::{self, Context, RichText, Ui};

use taxonomy_explorer::util::format_count;

use super::super::Explorer;

impl Explorer {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui, now: Instant) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(details) = self.engine.selection_details() else {
            ui.label("Click a node in the graph or search for one.");
            return;
        };

        ui.label(RichText::new(details.label.as_str()).strong());
        ui.small(details.id.as_str());
        ui.add_space(6.0);

        ui.label(format!("Type: {}", details.kind.label()));
        if let Some(skill_count) = details.skill_count {
            ui.label(format!("Skills: {}", format_count(skill_count)));
        }
        ui.label(format!("Connected nodes: {}", format_count(details.neighbors)));

        if let Some(description) = &details.description {
            ui.separator();
            egui::ScrollArea::vertical()
                .max_height(260.0)
                .show(ui, |ui| ui.label(description.as_str()));
        }

        ui.separator();
        if ui.button("Clear selection").clicked() {
            self.engine.clear_highlight(now);
        }
    }

    pub(in crate::app) fn draw_tooltip(&self, ctx: &Context) {
        let Some(tooltip) = self.engine.tooltip() else {
            return;
        };
        let origin = self.engine.renderer().rect().min;

        egui::Area::new(egui::Id::new("node-tooltip"))
            .order(egui::Order::Tooltip)
            .fixed_pos(origin + tooltip.anchor.to_vec2() + egui::vec2(12.0, 12.0))
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(280.0);
                    ui.label(RichText::new(tooltip.label.as_str()).strong());
                    ui.small(tooltip.kind.label());
                    if let Some(skill_count) = tooltip.skill_count {
                        ui.small(format!("Skills: {}", format_count(skill_count)));
                    }
                    if let Some(description) = &tooltip.description {
                        ui.label(description.as_str());
                    }
                });
            });
    }
}
