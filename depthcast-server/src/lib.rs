//! # depthcast-server: depth stream broadcast service
//!
//! Runs a depth+color source on a dedicated acquisition thread, encodes
//! each frame with `depthcast-core`, and fans the compressed payloads
//! out to every connected WebSocket consumer.
//!
//! Once a second the hub logs the bytes it delivered.

pub mod config;
pub mod service;
pub mod transport;
