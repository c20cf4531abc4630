//! # Millisecond Clock
//!
//! Timestamps are `u32` milliseconds that wrap after ~49.7 days. Consumers
//! must compare them with `now.wrapping_sub(then)`, never with `<` or `>`.

use std::cell::Cell;
use std::time::Instant;

/// Source of wrapping monotonic millisecond timestamps
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Clock backed by [`Instant`], counting from its creation
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wraparound
        self.origin.elapsed().as_millis() as u32
    }
}

/// Hand-driven clock for simulations and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    /// Move time forward, wrapping at `u32::MAX`
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}
