//! Raw sensor frame types handed from the frame source to the pipeline.
//!
//! Both frame kinds are immutable once delivered. The pipeline takes
//! ownership for one processing pass and then drops them (color frames
//! are retained until the next color frame replaces them).

use crate::error::DepthcastError;

/// Bytes per color sample (R, G, B).
pub const COLOR_CHANNELS: usize = 3;

/// Driver-supplied frame timestamp (sensor clock ticks).
pub type Timestamp = u32;

// ── Resolution ───────────────────────────────────────────────────

/// Native sensor resolution in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Samples per row.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
}

impl Resolution {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Total number of cells.
    pub const fn area(self) -> usize {
        self.width * self.height
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

// ── DepthFrame ───────────────────────────────────────────────────

/// A full-resolution depth capture, row-major, one `u16` per sample.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    /// Native resolution.
    pub resolution: Resolution,
    /// `width * height` samples in the sensor's native bit depth.
    pub data: Vec<u16>,
    /// Driver timestamp.
    pub timestamp: Timestamp,
}

impl DepthFrame {
    /// Build a frame, rejecting a buffer that does not match `resolution`.
    pub fn new(
        resolution: Resolution,
        data: Vec<u16>,
        timestamp: Timestamp,
    ) -> Result<Self, DepthcastError> {
        let expected = resolution.area();
        if data.len() != expected {
            return Err(DepthcastError::InvalidFrame {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            resolution,
            data,
            timestamp,
        })
    }

    /// Sample at row `y`, column `x`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn sample(&self, x: usize, y: usize) -> u16 {
        self.data[y * self.resolution.width + x]
    }
}

// ── ColorFrame ───────────────────────────────────────────────────

/// A full-resolution RGB capture, row-major, 3 bytes per pixel.
#[derive(Debug, Clone)]
pub struct ColorFrame {
    /// Native resolution.
    pub resolution: Resolution,
    /// `width * height * 3` interleaved RGB bytes.
    pub data: Vec<u8>,
    /// Driver timestamp.
    pub timestamp: Timestamp,
}

impl ColorFrame {
    /// Build a frame, rejecting a buffer that does not match `resolution`.
    pub fn new(
        resolution: Resolution,
        data: Vec<u8>,
        timestamp: Timestamp,
    ) -> Result<Self, DepthcastError> {
        let expected = resolution.area() * COLOR_CHANNELS;
        if data.len() != expected {
            return Err(DepthcastError::InvalidFrame {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            resolution,
            data,
            timestamp,
        })
    }

    /// The three channel bytes at row `y`, column `x`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let offset = (y * self.resolution.width + x) * COLOR_CHANNELS;
        &self.data[offset..offset + COLOR_CHANNELS]
    }
}
