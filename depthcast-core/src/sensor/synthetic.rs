//! Synthetic depth+color source.
//!
//! Produces a depth ramp sweeping across the frame and a color pattern
//! keyed on position and time, paced to a target frame rate. Useful for
//! running the server without hardware and for tests.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::DepthcastError;
use crate::pipeline::types::{COLOR_CHANNELS, ColorFrame, DepthFrame, Resolution, Timestamp};
use crate::sensor::{FrameSource, SensorCallbacks};

/// Largest 10-bit depth value.
const MAX_DEPTH: u32 = 1023;

/// Generated frame source.
#[derive(Debug, Clone)]
pub struct SyntheticSensor {
    resolution: Resolution,
    fps: u32,
    emit_color: bool,
    frame_limit: Option<u64>,
}

impl SyntheticSensor {
    pub fn new(resolution: Resolution, fps: u32) -> Self {
        Self {
            resolution,
            fps,
            emit_color: true,
            frame_limit: None,
        }
    }

    /// Disable the color stream (depth frames keep coming).
    pub fn without_color(mut self) -> Self {
        self.emit_color = false;
        self
    }

    /// Stop on its own after `frames` iterations.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Depth ramp for iteration `t`.
    pub fn depth_frame(&self, t: u64) -> DepthFrame {
        let Resolution { width, height } = self.resolution;
        let shift = (t * 8) as usize;
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(((x + y / 2 + shift) as u32 % (MAX_DEPTH + 1)) as u16);
            }
        }
        DepthFrame {
            resolution: self.resolution,
            data,
            timestamp: t as Timestamp,
        }
    }

    /// Color pattern for iteration `t`.
    pub fn color_frame(&self, t: u64) -> ColorFrame {
        let Resolution { width, height } = self.resolution;
        let mut data = Vec::with_capacity(width * height * COLOR_CHANNELS);
        for y in 0..height {
            for x in 0..width {
                data.push(x as u8);
                data.push(y as u8);
                data.push(t as u8);
            }
        }
        ColorFrame {
            resolution: self.resolution,
            data,
            timestamp: t as Timestamp,
        }
    }
}

impl FrameSource for SyntheticSensor {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn run(&mut self, callbacks: &mut dyn SensorCallbacks) -> Result<(), DepthcastError> {
        if self.fps == 0 {
            return Err(DepthcastError::Sensor("fps must be > 0".into()));
        }
        if self.resolution.area() == 0 {
            return Err(DepthcastError::Sensor("empty resolution".into()));
        }

        let interval = Duration::from_secs_f64(1.0 / self.fps as f64);
        info!(
            "synthetic sensor running at {}x{} @ {} fps",
            self.resolution.width, self.resolution.height, self.fps
        );

        let mut t: u64 = 0;
        while callbacks.on_tick() {
            if self.frame_limit.is_some_and(|limit| t >= limit) {
                break;
            }
            let started = Instant::now();

            if self.emit_color {
                callbacks.on_color_frame(self.color_frame(t));
            }
            callbacks.on_depth_frame(self.depth_frame(t));
            t += 1;

            let elapsed = started.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }

        debug!("synthetic sensor stopped after {t} frames");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
