use std::{cell::Cell, time::Instant};

pub trait Clock {
    /// Milliseconds since boot. Never decreases.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    boot: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.boot
            .elapsed()
            .as_millis()
            .try_into()
            .unwrap_or(u64::MAX)
    }
}

/// Hand-advanced clock for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.set(self.now_ms.get().saturating_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

pub fn is_due(now_ms: u64, last_run_ms: u64, interval_ms: u64) -> bool {
    now_ms.saturating_sub(last_run_ms) >= interval_ms
}

/// Returns true and stamps `last_run_ms` when the task should run now.
/// Intervals are "at least N ms"; lateness is not carried over.
pub fn run_if_due(last_run_ms: &mut u64, now_ms: u64, interval_ms: u64) -> bool {
    if is_due(now_ms, *last_run_ms, interval_ms) {
        *last_run_ms = now_ms;
        true
    } else {
        false
    }
}
