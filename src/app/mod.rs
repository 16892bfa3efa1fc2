use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use eframe::egui::{self, Context};
use tracing::info;

use taxonomy_explorer::config::EngineConfig;
use taxonomy_explorer::dataset::{LoadEvent, LoadProgress, spawn_load};
use taxonomy_explorer::engine::Engine;

mod canvas;
mod render_utils;
mod ui;

use canvas::CanvasRenderer;
use ui::FpsCounter;

const LOADING_REPAINT: Duration = Duration::from_millis(50);

pub struct TaxonomyApp {
    data_dir: PathBuf,
    config: EngineConfig,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<LoadEvent>,
        progress: LoadProgress,
    },
    Ready(Box<Explorer>),
    Error(String),
}

struct Explorer {
    engine: Engine<CanvasRenderer>,
    search_query: String,
    search_status: Option<String>,
    load_status: Option<String>,
    fps: FpsCounter,
}

impl TaxonomyApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, data_dir: PathBuf, config: EngineConfig) -> Self {
        let state = Self::start_load(&data_dir, &config);
        Self {
            data_dir,
            config,
            state,
        }
    }

    fn start_load(data_dir: &Path, config: &EngineConfig) -> AppState {
        info!(data_dir = %data_dir.display(), "loading dataset");
        AppState::Loading {
            rx: spawn_load(data_dir.to_path_buf(), config.timing.parse_yield()),
            progress: LoadProgress {
                percent: 0.0,
                stage: "Initializing...".to_owned(),
            },
        }
    }

    fn poll_load(
        rx: &Receiver<LoadEvent>,
        progress: &mut LoadProgress,
        config: &EngineConfig,
    ) -> Option<AppState> {
        loop {
            match rx.try_recv() {
                Ok(LoadEvent::Progress(update)) => *progress = update,
                Ok(LoadEvent::Finished(Ok(dataset))) => {
                    let engine = Engine::mount(
                        *dataset,
                        CanvasRenderer::new(config.camera.clone()),
                        config.clone(),
                        Instant::now(),
                    );
                    info!(percent = 100.0, stage = "Complete!", "load progress");
                    return Some(AppState::Ready(Box::new(Explorer::new(engine))));
                }
                Ok(LoadEvent::Finished(Err(error))) => {
                    return Some(AppState::Error(error.to_string()));
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    return Some(AppState::Error(
                        "Background load worker disconnected".to_owned(),
                    ));
                }
            }
        }
    }
}

impl eframe::App for TaxonomyApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx, progress } => {
                transition = Self::poll_load(rx, progress, &self.config);

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading taxonomy dataset...");
                        ui.add_space(8.0);
                        ui.add(
                            egui::ProgressBar::new(progress.percent / 100.0)
                                .desired_width(360.0)
                                .text(format!("{:.0}% {}", progress.percent, progress.stage)),
                        );
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint_after(LOADING_REPAINT);
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the taxonomy dataset");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.data_dir, &self.config));
                    }
                });
            }
            AppState::Ready(explorer) => explorer.show(ctx),
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}
