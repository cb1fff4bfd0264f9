//! Keyframe/delta depth encoder.
//!
//! Each pass over a coarse depth grid:
//!
//! 1. clips every sample to `[0, 2^B - 1]`,
//! 2. quantizes to 8 bits by shifting right `B - 8` bits (2 for the
//!    10-bit sensor default),
//! 3. computes the four quadrant means over the quantized grid,
//! 4. emits either the quantized grid (keyframe) or the per-cell
//!    wrap-around difference `(current - previous) mod 256` (delta frame).
//!
//! A delta of `255` is indistinguishable from `-1`; consumers undo it
//! with the same modular addition (see [`DepthReconstructor`]).
//! Dropped delta frames are not detected, so a consumer that misses one
//! drifts until the next keyframe.

use crate::error::DepthcastError;

/// Number of bits kept after quantization.
const QUANTIZED_BITS: u8 = 8;

// ── EncoderConfig ────────────────────────────────────────────────

/// Static encoder parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Sensor depth resolution in bits (10 for the default depth mode).
    pub depth_bits: u8,
    /// A keyframe is emitted every `keyframe_interval` frames.
    pub keyframe_interval: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            depth_bits: 10,
            keyframe_interval: 30,
        }
    }
}

impl EncoderConfig {
    /// Largest valid raw sample.
    pub fn max_sample(&self) -> u16 {
        ((1u32 << self.depth_bits) - 1) as u16
    }

    /// Right shift applied during quantization.
    pub fn shift(&self) -> u8 {
        self.depth_bits.saturating_sub(QUANTIZED_BITS)
    }

    fn validate(&self) -> Result<(), DepthcastError> {
        if !(QUANTIZED_BITS..=16).contains(&self.depth_bits) {
            return Err(DepthcastError::InvalidConfig("depth_bits must be in 8..=16"));
        }
        if self.keyframe_interval == 0 {
            return Err(DepthcastError::InvalidConfig("keyframe_interval must be > 0"));
        }
        Ok(())
    }
}

/// Clip `sample` to the sensor range and reduce it to 8 bits.
pub fn quantize(sample: u16, config: &EncoderConfig) -> u8 {
    (sample.min(config.max_sample()) >> config.shift()) as u8
}

// ── EncodedDepth ─────────────────────────────────────────────────

/// Output of one encoder pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedDepth {
    /// `true` when `field` holds absolute values.
    pub is_keyframe: bool,
    /// Means of the quantized grid: top-left, top-right, bottom-left,
    /// bottom-right.
    pub quadrant_means: [f32; 4],
    /// Quantized depth (keyframe) or modular delta (delta frame),
    /// row-major.
    pub field: Vec<u8>,
}

// ── DepthEncoder ─────────────────────────────────────────────────

/// Stateful encoder. Owned by the acquisition context; not shared.
pub struct DepthEncoder {
    config: EncoderConfig,
    height: usize,
    width: usize,
    /// Quantized grid from the previous pass.
    previous: Option<Vec<u8>>,
    /// Position in the keyframe cycle, always `< keyframe_interval`.
    frame_counter: u32,
}

impl DepthEncoder {
    /// Create an encoder for an `height x width` coarse grid.
    pub fn new(config: EncoderConfig, height: usize, width: usize) -> Result<Self, DepthcastError> {
        config.validate()?;
        Ok(Self {
            config,
            height,
            width,
            previous: None,
            frame_counter: 0,
        })
    }

    /// Current position in the keyframe cycle.
    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    /// Whether the next pass will produce a keyframe.
    pub fn next_is_keyframe(&self) -> bool {
        self.frame_counter == 0 || self.previous.is_none()
    }

    /// Force the next pass to be a keyframe.
    pub fn reset(&mut self) {
        self.previous = None;
        self.frame_counter = 0;
    }

    /// Encode one coarse depth grid and advance the keyframe cycle.
    pub fn encode(&mut self, coarse: &[u16]) -> Result<EncodedDepth, DepthcastError> {
        let expected = self.height * self.width;
        if coarse.len() != expected {
            return Err(DepthcastError::InvalidFrame {
                expected,
                actual: coarse.len(),
            });
        }

        let quantized: Vec<u8> = coarse.iter().map(|&s| quantize(s, &self.config)).collect();
        let quadrant_means = self.quadrant_means(&quantized);

        let is_keyframe = self.next_is_keyframe();
        let field = match (&self.previous, is_keyframe) {
            (Some(prev), false) => quantized
                .iter()
                .zip(prev)
                .map(|(&cur, &last)| cur.wrapping_sub(last))
                .collect(),
            _ => quantized.clone(),
        };

        self.previous = Some(quantized);
        self.frame_counter = (self.frame_counter + 1) % self.config.keyframe_interval;

        Ok(EncodedDepth {
            is_keyframe,
            quadrant_means,
            field,
        })
    }

    /// Means over the four quadrants split at `h / 2` and `w / 2`.
    /// An empty quadrant reports `0.0`.
    fn quadrant_means(&self, grid: &[u8]) -> [f32; 4] {
        let (h, w) = (self.height, self.width);
        let (half_h, half_w) = (h / 2, w / 2);
        let mean = |rows: std::ops::Range<usize>, cols: std::ops::Range<usize>| -> f32 {
            let count = rows.len() * cols.len();
            if count == 0 {
                return 0.0;
            }
            let sum: u64 = rows
                .flat_map(|y| cols.clone().map(move |x| grid[y * w + x] as u64))
                .sum();
            (sum as f64 / count as f64) as f32
        };
        [
            mean(0..half_h, 0..half_w),
            mean(0..half_h, half_w..w),
            mean(half_h..h, 0..half_w),
            mean(half_h..h, half_w..w),
        ]
    }
}

// ── DepthReconstructor ───────────────────────────────────────────

/// Consumer-side inverse of [`DepthEncoder`]: rebuilds the absolute
/// quantized depth grid from a keyframe followed by delta frames.
#[derive(Debug, Default)]
pub struct DepthReconstructor {
    current: Option<Vec<u8>>,
}

impl DepthReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded depth field and return the absolute grid.
    pub fn apply(&mut self, is_keyframe: bool, field: &[u8]) -> Result<&[u8], DepthcastError> {
        if is_keyframe {
            self.current = Some(field.to_vec());
        } else {
            let current = self.current.as_mut().ok_or_else(|| {
                DepthcastError::MalformedPayload("delta frame before first keyframe".into())
            })?;
            if current.len() != field.len() {
                return Err(DepthcastError::InvalidFrame {
                    expected: current.len(),
                    actual: field.len(),
                });
            }
            for (cell, &delta) in current.iter_mut().zip(field) {
                *cell = cell.wrapping_add(delta);
            }
        }
        Ok(self.current.as_deref().unwrap_or_default())
    }
}

// ── Tests ────────────────────────────────────────────────────────
