use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use super::debounce::Debouncer;
use crate::config::QualityConfig;
use crate::render::RenderSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

/// How much of the graph a search may look at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchBudget {
    pub scan_limit: usize,
    pub max_matches: usize,
}

impl QualityTier {
    /// Zoomed out (large ratio) is low; zoomed in is high.
    pub fn for_ratio(ratio: f32, thresholds: &QualityConfig) -> Self {
        if ratio > thresholds.low_above_ratio {
            QualityTier::Low
        } else if ratio <= thresholds.high_at_or_below_ratio {
            QualityTier::High
        } else {
            QualityTier::Medium
        }
    }

    pub fn label_size(self) -> f32 {
        match self {
            QualityTier::Low => 8.0,
            QualityTier::Medium => 10.0,
            QualityTier::High => 12.0,
        }
    }

    pub fn render_settings(self) -> RenderSettings {
        let low = self == QualityTier::Low;
        RenderSettings {
            render_labels: !low,
            hide_labels_on_move: low,
            label_size: self.label_size(),
            hide_edges_on_move: low,
        }
    }

    pub fn search_budget(self) -> SearchBudget {
        match self {
            QualityTier::Low => SearchBudget {
                scan_limit: 500,
                max_matches: 5,
            },
            QualityTier::Medium => SearchBudget {
                scan_limit: 2000,
                max_matches: 15,
            },
            QualityTier::High => SearchBudget {
                scan_limit: 5000,
                max_matches: 30,
            },
        }
    }

    pub fn search_ratio(self) -> f32 {
        match self {
            QualityTier::Low => 0.2,
            QualityTier::Medium => 0.05,
            QualityTier::High => 0.01,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

/// Tracks the zoom-dependent quality tier and whether the camera is moving.
#[derive(Debug)]
pub struct QualityManager {
    thresholds: QualityConfig,
    tier: QualityTier,
    settle: Debouncer<f32>,
    cooldown: Debouncer,
    interacting: bool,
}

impl QualityManager {
    pub fn new(thresholds: QualityConfig, zoom_settle: Duration, cooldown: Duration) -> Self {
        Self {
            thresholds,
            tier: QualityTier::Medium,
            settle: Debouncer::new(zoom_settle),
            cooldown: Debouncer::new(cooldown),
            interacting: false,
        }
    }

    pub fn on_camera_update(&mut self, ratio: f32, now: Instant) {
        self.settle.trigger(now, ratio);
        if self.cooldown.trigger(now, ()) {
            self.interacting = true;
        }
    }

    /// Applies settled transitions; returns the new tier if it changed.
    pub fn poll(&mut self, now: Instant) -> Option<QualityTier> {
        if self.cooldown.poll(now).is_some() {
            self.interacting = false;
        }

        let ratio = self.settle.poll(now)?;
        let tier = QualityTier::for_ratio(ratio, &self.thresholds);
        if tier == self.tier {
            return None;
        }

        info!(from = self.tier.label(), to = tier.label(), ratio, "quality tier changed");
        self.tier = tier;
        Some(tier)
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn search_budget(&self) -> SearchBudget {
        let mut budget = self.tier.search_budget();
        if self.interacting {
            budget.max_matches = QualityTier::Low.search_budget().max_matches;
        }
        budget
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.settle.deadline(), self.cooldown.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
