//! Fixed-stride spatial downsampling.
//!
//! The coarse grid keeps every `stride`-th sample in both directions:
//! coarse cell `(i, j)` maps to native coordinate `(i * stride, j * stride)`.
//! Grid dimensions use integer division, so a stride that does not evenly
//! divide the native resolution silently drops the trailing partial
//! rows/columns. That truncation is intended.
//!
//! The [`IndexGrid`] is computed once at startup and shared read-only
//! (behind an `Arc`) by every processing pass, for depth and color alike.

use crate::error::DepthcastError;
use crate::pipeline::types::{COLOR_CHANNELS, ColorFrame, DepthFrame, Resolution};

/// Precomputed row/column index sets mapping the coarse grid onto
/// native sensor coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexGrid {
    native: Resolution,
    stride: usize,
    /// Native row index for each coarse row.
    rows: Vec<usize>,
    /// Native column index for each coarse column.
    cols: Vec<usize>,
}

impl IndexGrid {
    /// Build the index sets for `native` resolution sampled every `stride`.
    pub fn new(native: Resolution, stride: usize) -> Result<Self, DepthcastError> {
        if stride == 0 {
            return Err(DepthcastError::InvalidConfig("stride must be > 0"));
        }
        let h = native.height / stride;
        let w = native.width / stride;
        Ok(Self {
            native,
            stride,
            rows: (0..h).map(|i| i * stride).collect(),
            cols: (0..w).map(|j| j * stride).collect(),
        })
    }

    /// Coarse grid height (`H / stride`).
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Coarse grid width (`W / stride`).
    pub fn width(&self) -> usize {
        self.cols.len()
    }

    /// Number of coarse cells (`h * w`).
    pub fn cells(&self) -> usize {
        self.rows.len() * self.cols.len()
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn native(&self) -> Resolution {
        self.native
    }

    /// Native `(row, col)` for coarse cell `(i, j)`.
    pub fn native_coord(&self, i: usize, j: usize) -> (usize, usize) {
        (self.rows[i], self.cols[j])
    }

    /// Sample the depth frame on the coarse grid (row-major, `h * w`).
    pub fn sample_depth(&self, frame: &DepthFrame) -> Result<Vec<u16>, DepthcastError> {
        self.check(frame.resolution, frame.data.len(), frame.resolution.area())?;
        let mut out = Vec::with_capacity(self.cells());
        for &y in &self.rows {
            for &x in &self.cols {
                out.push(frame.sample(x, y));
            }
        }
        Ok(out)
    }

    /// Sample the color frame on the coarse grid, yielding one RGB
    /// triple per coarse cell (row-major).
    pub fn sample_color(&self, frame: &ColorFrame) -> Result<Vec<[u8; 3]>, DepthcastError> {
        self.check(
            frame.resolution,
            frame.data.len(),
            frame.resolution.area() * COLOR_CHANNELS,
        )?;
        let mut out = Vec::with_capacity(self.cells());
        for &y in &self.rows {
            for &x in &self.cols {
                let px = frame.pixel(x, y);
                out.push([px[0], px[1], px[2]]);
            }
        }
        Ok(out)
    }

    fn check(
        &self,
        resolution: Resolution,
        actual: usize,
        expected: usize,
    ) -> Result<(), DepthcastError> {
        if resolution != self.native {
            return Err(DepthcastError::InvalidFrame {
                expected: self.native.area(),
                actual: resolution.area(),
            });
        }
        if actual != expected {
            return Err(DepthcastError::InvalidFrame { expected, actual });
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
