//! Time adapters.
//!
//! The RPC layer only ever needs fixed pauses, expressed through
//! [`embedded_hal::delay::DelayNs`]:
//!
//! - [`StdDelay`] blocks the calling thread (host builds).
//! - [`RecordingDelay`] returns immediately and remembers how long it was
//!   asked to wait, for tests and simulation.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

/// Blocking delay backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl StdDelay {
    pub fn new() -> Self {
        Self
    }
}

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Non-blocking delay that records every requested pause.
#[derive(Debug, Default, Clone)]
pub struct RecordingDelay {
    total_ns: u64,
    calls: usize,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all requested pauses, in milliseconds (rounded down).
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }

    /// Number of pauses requested.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
        self.calls += 1;
    }
}

/// Milliseconds elapsed since `start`, saturating at `u64::MAX`.
pub fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
