use std::time::Instant;

use eframe::egui::{self, Key, RichText, Ui};

use taxonomy_explorer::engine::LoadOutcome;
use taxonomy_explorer::engine::progressive::LoadSkip;
use taxonomy_explorer::util::format_count;

use super::super::Explorer;

fn load_message(outcome: LoadOutcome) -> String {
    match outcome {
        LoadOutcome::Started { skills } => format!("Loading {} skills...", format_count(skills)),
        LoadOutcome::Skipped(LoadSkip::InFlight) => "A skill batch is still loading.".to_owned(),
        LoadOutcome::Skipped(LoadSkip::Busy) => "Wait for the graph to finish building.".to_owned(),
        LoadOutcome::Skipped(LoadSkip::Exhausted) => "All skills are loaded.".to_owned(),
        LoadOutcome::Skipped(LoadSkip::InitialDone) => "Initial skills already loaded.".to_owned(),
    }
}

impl Explorer {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui, now: Instant) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search occupations, skills and groups");
        let mut submit = false;
        ui.horizontal(|ui| {
            let response = ui.text_edit_singleline(&mut self.search_query);
            submit |= response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));
            submit |= ui.button("Search").clicked();
        });
        if submit {
            let query = self.search_query.trim().to_owned();
            self.search_status = Some(match self.engine.search(&query, now) {
                Some(hit) => format!("Found \"{}\"", hit.label),
                None if query.is_empty() => "Type something to search.".to_owned(),
                None => format!("No match for \"{query}\""),
            });
        }
        if let Some(status) = &self.search_status {
            ui.small(status.as_str());
        }

        ui.separator();
        ui.label(RichText::new("Skills").strong());
        let stats = self.engine.stats();
        ui.add(
            egui::ProgressBar::new(stats.load_percent / 100.0).text(format!(
                "{} / {} skills ({:.1}%)",
                format_count(stats.skills_loaded),
                format_count(stats.skills_total),
                stats.load_percent
            )),
        );

        let idle = !self.engine.load_in_flight() && !self.engine.is_busy();
        if !self.engine.initial_skills_loaded() {
            let button = ui
                .add_enabled(idle, egui::Button::new("Load initial skills"))
                .on_hover_text("Add the best-connected skills that are not in the graph yet.");
            if button.clicked() {
                self.load_status = Some(load_message(self.engine.load_initial_skills()));
            }
        } else {
            let button = ui
                .add_enabled(idle, egui::Button::new("Load more skills"))
                .on_hover_text("Add the next batch of skills, most connected first.");
            if button.clicked() {
                self.load_status = Some(load_message(self.engine.load_more(None)));
            }
        }
        if let Some(progress) = stats.insertion {
            ui.add(egui::ProgressBar::new(progress.fraction()).text("Inserting..."));
        } else if let Some(status) = &self.load_status {
            ui.small(status.as_str());
        }

        ui.separator();
        ui.label(RichText::new("View").strong());
        ui.horizontal(|ui| {
            if ui.button("Zoom in").clicked() {
                self.engine.zoom_in();
            }
            if ui.button("Zoom out").clicked() {
                self.engine.zoom_out();
            }
            if ui.button("Reset view").clicked() {
                self.engine.reset_view(now);
            }
        });

        ui.add_space(4.0);
        ui.label(format!(
            "Quality: {} (zoom ratio {:.3})",
            stats.quality.label(),
            stats.zoom_ratio
        ));
        if stats.interacting {
            ui.small("Moving...");
        }
        ui.small(format!("Expanded groups: {}", stats.expanded_clusters));
        ui.small("Click a group to expand it. Click empty space to clear highlights.");
    }
}
