//! Frame source boundary.
//!
//! A [`FrameSource`] owns a blocking acquisition run loop and drives a
//! [`SensorCallbacks`] implementation from its own thread. Depth and
//! color arrive independently; `on_tick` is polled once per loop
//! iteration and is the only way to stop the loop, so a stop request
//! takes effect between frames, never in the middle of one.

pub mod synthetic;

pub use synthetic::SyntheticSensor;

use crate::error::DepthcastError;
use crate::pipeline::types::{ColorFrame, DepthFrame, Resolution};

/// Callbacks invoked on the acquisition thread.
pub trait SensorCallbacks {
    /// A depth frame is ready.
    fn on_depth_frame(&mut self, frame: DepthFrame);

    /// A color frame is ready.
    fn on_color_frame(&mut self, frame: ColorFrame);

    /// Polled once per loop iteration; return `false` to stop.
    fn on_tick(&mut self) -> bool;
}

/// A depth+color sensor driver.
pub trait FrameSource: Send {
    /// Native resolution of both streams.
    fn resolution(&self) -> Resolution;

    /// Run the acquisition loop until `on_tick` returns `false`.
    ///
    /// Blocks the calling thread. Returns an error if the device cannot
    /// be started.
    fn run(&mut self, callbacks: &mut dyn SensorCallbacks) -> Result<(), DepthcastError>;
}
