//! Flat byte layout of one processed frame.
//!
//! ## Wire format (before compression)
//!
//! ```text
//! is_keyframe:    u8          (1)     0 or 1
//! quadrant_means: [u8; 4]     (4)     TL, TR, BL, BR
//! depth:          [u8; h*w]   (h*w)   quantized depth or modular delta
//! luminance:      [u8; h*w]   (h*w)   mean of R, G, B per coarse cell
//! ```
//!
//! Every field is a single byte, row-major. Float values are truncated
//! toward zero when narrowed to `u8`. Clients treat the layout as
//! opaque, so the order must never change.

use crate::error::DepthcastError;
use crate::pipeline::encoder::EncodedDepth;

/// Bytes preceding the two per-cell fields.
pub const HEADER_LEN: usize = 1 + 4;

/// Packed length for a grid of `cells` coarse cells.
pub const fn packed_len(cells: usize) -> usize {
    HEADER_LEN + 2 * cells
}

/// Per-cell luminance: the truncated mean of the three channels.
pub fn luminance(samples: &[[u8; 3]]) -> Vec<u8> {
    samples
        .iter()
        .map(|[r, g, b]| ((*r as u16 + *g as u16 + *b as u16) / 3) as u8)
        .collect()
}

// ── ProcessedFrame ───────────────────────────────────────────────

/// A fully encoded frame awaiting packing and compression.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFrame {
    pub is_keyframe: bool,
    pub quadrant_means: [f32; 4],
    /// Depth field followed by the luminance field.
    pub payload: Vec<u8>,
}

impl ProcessedFrame {
    /// Join encoder output with the luminance field of the paired color frame.
    pub fn new(depth: EncodedDepth, luminance: &[u8]) -> Result<Self, DepthcastError> {
        if depth.field.len() != luminance.len() {
            return Err(DepthcastError::InvalidFrame {
                expected: depth.field.len(),
                actual: luminance.len(),
            });
        }
        let mut payload = depth.field;
        payload.extend_from_slice(luminance);
        Ok(Self {
            is_keyframe: depth.is_keyframe,
            quadrant_means: depth.quadrant_means,
            payload,
        })
    }

    /// Serialize into the wire layout.
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.push(self.is_keyframe as u8);
        out.extend(self.quadrant_means.iter().map(|&m| m as u8));
        out.extend_from_slice(&self.payload);
        out
    }
}

// ── PackedFrame ──────────────────────────────────────────────────

/// Borrowed view over a decompressed wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedFrame<'a> {
    pub is_keyframe: bool,
    pub quadrant_means: [u8; 4],
    pub depth: &'a [u8],
    pub luminance: &'a [u8],
}

impl<'a> PackedFrame<'a> {
    /// Split `bytes` for a grid of `cells` coarse cells.
    pub fn parse(bytes: &'a [u8], cells: usize) -> Result<Self, DepthcastError> {
        let expected = packed_len(cells);
        if bytes.len() != expected {
            return Err(DepthcastError::MalformedPayload(format!(
                "expected {expected} bytes, got {}",
                bytes.len()
            )));
        }
        let is_keyframe = match bytes[0] {
            0 => false,
            1 => true,
            other => {
                return Err(DepthcastError::MalformedPayload(format!(
                    "keyframe flag must be 0 or 1, got {other}"
                )));
            }
        };
        let (depth, luminance) = bytes[HEADER_LEN..].split_at(cells);
        Ok(Self {
            is_keyframe,
            quadrant_means: [bytes[1], bytes[2], bytes[3], bytes[4]],
            depth,
            luminance,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
