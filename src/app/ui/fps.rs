use std::collections::VecDeque;

use eframe::egui::Context;

const SAMPLE_WINDOW: usize = 180;

/// Rolling frame-rate readout fed from egui's smoothed frame delta.
#[derive(Default)]
pub(in crate::app) struct FpsCounter {
    current: f32,
    samples: VecDeque<f32>,
}

impl FpsCounter {
    pub(super) fn update(&mut self, ctx: &Context) {
        let dt = ctx.input(|input| input.stable_dt);
        self.record(dt);
    }

    fn record(&mut self, dt: f32) {
        if dt <= f32::EPSILON {
            return;
        }
        self.current = (1.0 / dt).clamp(0.0, 1000.0);
        self.samples.push_back(self.current);
        while self.samples.len() > SAMPLE_WINDOW {
            self.samples.pop_front();
        }
    }

    fn average(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f32>() / self.samples.len() as f32)
    }

    pub(super) fn display_text(&self) -> Option<String> {
        if self.current <= f32::EPSILON {
            return None;
        }
        let mut parts = vec![format!("FPS {:.0}", self.current)];
        if let Some(average) = self.average() {
            parts.push(format!("avg {average:.1}"));
        }
        parts.push(format!("{:.1} ms", 1000.0 / self.current));
        Some(parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_bounded_and_text_reports_frame_time() {
        let mut fps = FpsCounter::default();
        assert!(fps.display_text().is_none());

        for _ in 0..(SAMPLE_WINDOW + 20) {
            fps.record(0.02);
        }
        assert_eq!(fps.samples.len(), SAMPLE_WINDOW);
        assert_eq!(fps.display_text().as_deref(), Some("FPS 50 | avg 50.0 | 20.0 ms"));
    }
}
