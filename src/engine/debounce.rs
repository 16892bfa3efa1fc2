use std::time::{Duration, Instant};

/// Leading/trailing debounce over an injected clock.
///
/// `trigger` reports the leading edge of a burst; `poll` yields the latest
/// value once `delay` has passed without another trigger.
#[derive(Debug)]
pub struct Debouncer<T = ()> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn trigger(&mut self, now: Instant, value: T) -> bool {
        let leading = self.pending.is_none();
        self.pending = Some((now + self.delay, value));
        leading
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }
}
