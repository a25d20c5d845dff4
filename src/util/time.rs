//! Time utilities for frame-driven simulation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tick rate the authoritative server simulates at
pub const SERVER_TPS: u32 = 60;
/// Default client render rate
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Convert a server tick number into simulation seconds
pub fn tick_to_secs(tick: u64) -> f64 {
    tick as f64 / SERVER_TPS as f64
}

/// Interval between rendered frames at the given rate
pub fn frame_interval(frame_rate: u32) -> Duration {
    Duration::from_micros(1_000_000 / frame_rate.max(1) as u64)
}

/// Source of monotonic time for the engine.
///
/// The value returned is measured from an arbitrary origin; only differences
/// between two readings of the same clock are meaningful.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall clock backed by `Instant`
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Manually driven clock. Clones share the same reading, so a test (or a
/// replay driver) can hold one handle while the engine holds another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(by.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn set(&self, at: Duration) {
        self.micros.store(at.as_micros() as u64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::Relaxed))
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}
