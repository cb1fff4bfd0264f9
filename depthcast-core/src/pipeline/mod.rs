//! # Frame encoding pipeline
//!
//! Turns paired depth+color sensor frames into one compressed binary
//! message per depth frame.
//!
//! ## Architecture
//!
//! ```text
//! acquisition thread                               hub task
//! ┌──────────────────────────────┐
//! │ DepthFrame / ColorFrame      │
//! │   ↓                          │
//! │ IndexGrid (downsample)       │
//! │   ↓                          │
//! │ DepthEncoder + luminance     │
//! │   ↓                          │
//! │ ProcessedFrame::pack         │
//! │   ↓                          │
//! │ Compressor                   │   HubHandle    ┌──────────────┐
//! │   ↓                          │ ─────────────► │ BroadcastHub │
//! └──────────────────────────────┘                └──────────────┘
//! ```
//!
//! ## Sub-modules
//!
//! | Module       | Purpose                                              |
//! |------------- |------------------------------------------------------|
//! | `types`      | Raw depth/color frames and resolution                |
//! | `downsample` | Fixed-stride coarse grid sampling                    |
//! | `encoder`    | Quantization, quadrant means, keyframe/delta cycle   |
//! | `packer`     | Flat wire layout and its parser                      |
//! | `compress`   | Lossless codec boundary (zstd)                       |
//! | `processor`  | Sensor callbacks wiring the stages together          |

pub mod compress;
pub mod downsample;
pub mod encoder;
pub mod packer;
pub mod processor;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────

pub use compress::{Compressor, ZstdCompressor};
pub use downsample::IndexGrid;
pub use encoder::{DepthEncoder, DepthReconstructor, EncodedDepth, EncoderConfig};
pub use packer::{PackedFrame, ProcessedFrame, packed_len};
pub use processor::{FrameProcessor, PipelineConfig, PipelineStats};
pub use types::{ColorFrame, DepthFrame, Resolution, Timestamp};
