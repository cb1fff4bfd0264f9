//! Broadcast throughput metering.
//!
//! A plain running byte count, incremented by every broadcast and
//! read-and-reset by the periodic reporter. Both happen on the hub task,
//! so no atomics are needed.

use std::time::Duration;

/// Running byte/frame count for the current reporting window.
#[derive(Debug, Default)]
pub struct ThroughputCounter {
    bytes: u64,
    frames: u64,
}

impl ThroughputCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one broadcast of `bytes` bytes.
    pub fn record(&mut self, bytes: usize) {
        self.bytes += bytes as u64;
        self.frames += 1;
    }

    /// Bytes recorded in the current window.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Read the window totals and start a new window.
    pub fn take(&mut self) -> (u64, u64) {
        let totals = (self.bytes, self.frames);
        self.bytes = 0;
        self.frames = 0;
        totals
    }
}

// ── ThroughputReport ─────────────────────────────────────────────

/// One reporting window, as published to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThroughputReport {
    /// Bytes broadcast per second over the window.
    pub bytes_per_sec: u64,
    /// Frames broadcast in the window.
    pub frames: u64,
    /// Consumers registered at report time.
    pub consumers: usize,
}

impl ThroughputReport {
    /// Normalise window totals to a per-second rate.
    pub fn from_window(bytes: u64, frames: u64, consumers: usize, window: Duration) -> Self {
        let bytes_per_sec = if window == Duration::from_secs(1) {
            bytes
        } else {
            let secs = window.as_secs_f64().max(f64::EPSILON);
            (bytes as f64 / secs) as u64
        };
        Self {
            bytes_per_sec,
            frames,
            consumers,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
