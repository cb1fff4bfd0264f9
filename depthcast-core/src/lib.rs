//! # depthcast-core
//!
//! Core library for streaming depth+color sensor frames to many
//! consumers in real time.
//!
//! This crate contains:
//! - **Pipeline**: downsampling, keyframe/delta depth encoding, byte
//!   packing and compression (`pipeline`)
//! - **Hub**: consumer registry, non-blocking broadcast hand-off and
//!   throughput reporting (`hub`)
//! - **Sensor**: the frame-source boundary and a synthetic source (`sensor`)
//! - **Error**: `DepthcastError`, typed, `thiserror`-based error hierarchy

pub mod error;
pub mod hub;
pub mod pipeline;
pub mod sensor;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::DepthcastError;
pub use hub::{BroadcastHub, Consumer, ConsumerId, HubConfig, HubHandle, QueuePolicy, ThroughputReport};
pub use pipeline::{
    ColorFrame, DepthFrame, FrameProcessor, IndexGrid, PipelineConfig, PipelineStats, Resolution,
};
pub use sensor::{FrameSource, SensorCallbacks, SyntheticSensor};
