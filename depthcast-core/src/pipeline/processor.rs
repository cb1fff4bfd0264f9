//! Acquisition-side frame processing.
//!
//! [`FrameProcessor`] is the [`SensorCallbacks`] implementation that runs
//! on the acquisition thread. For each depth frame it:
//!
//! 1. skips the frame if no color frame has arrived yet,
//! 2. samples depth and color on the shared [`IndexGrid`],
//! 3. encodes depth ([`DepthEncoder`]) and derives luminance,
//! 4. packs and compresses the result,
//! 5. hands the compressed bytes to the hub via [`HubHandle::broadcast`].
//!
//! Nothing here waits on the network: the hand-off is a non-blocking
//! enqueue. Failures are contained to the frame that caused them.

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::DepthcastError;
use crate::hub::broadcast::HubHandle;
use crate::pipeline::compress::{Compressor, DEFAULT_LEVEL, DEFAULT_WINDOW_LOG, ZstdCompressor};
use crate::pipeline::downsample::IndexGrid;
use crate::pipeline::encoder::{DepthEncoder, EncoderConfig};
use crate::pipeline::packer::{ProcessedFrame, luminance};
use crate::pipeline::types::{COLOR_CHANNELS, ColorFrame, DepthFrame, Resolution};
use crate::sensor::SensorCallbacks;

// ── PipelineConfig ───────────────────────────────────────────────

/// Configuration for [`FrameProcessor`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Downsampling stride in native samples.
    pub stride: usize,
    /// Depth encoder parameters.
    pub encoder: EncoderConfig,
    /// zstd compression level.
    pub compression_level: i32,
    /// zstd window size as a power of two.
    pub window_log: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stride: 4,
            encoder: EncoderConfig::default(),
            compression_level: DEFAULT_LEVEL,
            window_log: DEFAULT_WINDOW_LOG,
        }
    }
}

// ── PipelineStats ────────────────────────────────────────────────

/// Per-frame outcome counters, owned by the acquisition thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Depth frames delivered by the source.
    pub depth_frames: u64,
    /// Depth frames skipped because no color frame had arrived.
    pub skipped_no_color: u64,
    /// Frames encoded, compressed and handed off.
    pub broadcast: u64,
    /// Of those, keyframes.
    pub keyframes: u64,
    /// Frames dropped on malformed input or codec failure.
    pub dropped: u64,
    /// Frames lost because the hub had already stopped.
    pub handoff_failures: u64,
}

// ── FrameProcessor ───────────────────────────────────────────────

/// Encoding pipeline state for one acquisition thread.
pub struct FrameProcessor {
    grid: Arc<IndexGrid>,
    encoder: DepthEncoder,
    compressor: Box<dyn Compressor>,
    latest_color: Option<ColorFrame>,
    hub: HubHandle,
    shutdown: CancellationToken,
    stats: PipelineStats,
}

impl FrameProcessor {
    /// Build a processor with the bundled zstd codec.
    pub fn new(
        config: &PipelineConfig,
        native: Resolution,
        hub: HubHandle,
        shutdown: CancellationToken,
    ) -> Result<Self, DepthcastError> {
        let grid = Arc::new(IndexGrid::new(native, config.stride)?);
        let compressor = ZstdCompressor::new(config.compression_level, config.window_log)?;
        Self::with_compressor(grid, config.encoder, Box::new(compressor), hub, shutdown)
    }

    /// Build a processor around an existing grid and codec.
    pub fn with_compressor(
        grid: Arc<IndexGrid>,
        encoder: EncoderConfig,
        compressor: Box<dyn Compressor>,
        hub: HubHandle,
        shutdown: CancellationToken,
    ) -> Result<Self, DepthcastError> {
        let encoder = DepthEncoder::new(encoder, grid.height(), grid.width())?;
        Ok(Self {
            grid,
            encoder,
            compressor,
            latest_color: None,
            hub,
            shutdown,
            stats: PipelineStats::default(),
        })
    }

    pub fn grid(&self) -> &Arc<IndexGrid> {
        &self.grid
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Whether a color frame is available to pair with depth.
    pub fn has_color(&self) -> bool {
        self.latest_color.is_some()
    }

    /// Run one depth frame through the pipeline and return the
    /// compressed payload.
    ///
    /// Fails with [`DepthcastError::ColorUnavailable`] until a color
    /// frame has arrived. Encoder state is untouched unless the frame is
    /// fully usable.
    pub fn process_depth(&mut self, frame: &DepthFrame) -> Result<Bytes, DepthcastError> {
        let Some(color) = &self.latest_color else {
            return Err(DepthcastError::ColorUnavailable);
        };

        let depth = self.grid.sample_depth(frame)?;
        let lum = luminance(&self.grid.sample_color(color)?);

        let encoded = self.encoder.encode(&depth)?;
        let processed = ProcessedFrame::new(encoded, &lum)?;

        match self.compressor.compress(&processed.pack()) {
            Ok(compressed) => {
                if processed.is_keyframe {
                    self.stats.keyframes += 1;
                }
                Ok(Bytes::from(compressed))
            }
            Err(e) => {
                // Consumers never see this frame, so the next delta
                // would be relative to a frame they lack.
                self.encoder.reset();
                Err(e)
            }
        }
    }
}

impl SensorCallbacks for FrameProcessor {
    fn on_depth_frame(&mut self, frame: DepthFrame) {
        self.stats.depth_frames += 1;
        match self.process_depth(&frame) {
            Ok(payload) => {
                if let Err(e) = self.hub.broadcast(payload, true) {
                    self.stats.handoff_failures += 1;
                    debug!("frame {} not handed off: {e}", frame.timestamp);
                } else {
                    self.stats.broadcast += 1;
                }
            }
            Err(DepthcastError::ColorUnavailable) => {
                self.stats.skipped_no_color += 1;
                trace!("depth frame {} skipped: no color yet", frame.timestamp);
            }
            Err(e) => {
                self.stats.dropped += 1;
                warn!("depth frame {} dropped: {e}", frame.timestamp);
            }
        }
    }

    fn on_color_frame(&mut self, frame: ColorFrame) {
        if frame.resolution != self.grid.native() {
            self.stats.dropped += 1;
            warn!(
                "color frame {} dropped: {}x{} does not match sensor resolution",
                frame.timestamp, frame.resolution.width, frame.resolution.height
            );
            return;
        }
        let expected = frame.resolution.area() * COLOR_CHANNELS;
        if frame.data.len() != expected {
            self.stats.dropped += 1;
            warn!(
                "color frame {} dropped: expected {expected} bytes, got {}",
                frame.timestamp,
                frame.data.len()
            );
            return;
        }
        self.latest_color = Some(frame);
    }

    fn on_tick(&mut self) -> bool {
        !self.shutdown.is_cancelled()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::broadcast::{BroadcastHub, HubCommand, HubConfig};
    use crate::pipeline::packer::{PackedFrame, packed_len};

    struct FailingCodec;

    impl Compressor for FailingCodec {
        fn compress(&mut self, _: &[u8]) -> Result<Vec<u8>, DepthcastError> {
            Err(DepthcastError::Compression("out of memory".into()))
        }
        fn decompress(&mut self, _: &[u8], _: usize) -> Result<Vec<u8>, DepthcastError> {
            Err(DepthcastError::Compression("out of memory".into()))
        }
    }

    fn processor(native: Resolution) -> (FrameProcessor, BroadcastHub) {
        let (hub, handle) = BroadcastHub::new(HubConfig::default());
        let p = FrameProcessor::new(
            &PipelineConfig::default(),
            native,
            handle,
            CancellationToken::new(),
        )
        .unwrap();
        (p, hub)
    }

    fn depth(native: Resolution, value: u16, t: u32) -> DepthFrame {
        DepthFrame::new(native, vec![value; native.area()], t).unwrap()
    }

    fn color(native: Resolution, rgb: [u8; 3]) -> ColorFrame {
        let data = rgb.iter().copied().cycle().take(native.area() * 3).collect();
        ColorFrame::new(native, data, 0).unwrap()
    }

    #[test]
    fn no_color_means_no_output_and_no_state_change() {
        let native = Resolution::new(16, 8);
        let (mut p, _hub) = processor(native);
        let err = p.process_depth(&depth(native, 400, 0)).unwrap_err();
        assert!(matches!(err, DepthcastError::ColorUnavailable));
        assert_eq!(p.encoder.frame_counter(), 0);
        assert!(p.encoder.next_is_keyframe());
    }

    #[test]
    fn kinect_frame_decodes_to_expected_layout() {
        let native = Resolution::new(640, 480);
        let (mut p, _hub) = processor(native);
        p.on_color_frame(color(native, [30, 60, 90]));

        let bytes = p.process_depth(&depth(native, 400, 0)).unwrap();
        let cells = p.grid().cells();
        assert_eq!(cells, 19_200);

        let mut codec = ZstdCompressor::new(DEFAULT_LEVEL, DEFAULT_WINDOW_LOG).unwrap();
        let raw = codec.decompress(&bytes, packed_len(cells)).unwrap();
        assert_eq!(raw.len(), 38_405);

        let frame = PackedFrame::parse(&raw, cells).unwrap();
        assert!(frame.is_keyframe);
        assert_eq!(frame.quadrant_means, [100; 4]);
        assert!(frame.depth.iter().all(|&d| d == 100));
        assert!(frame.luminance.iter().all(|&l| l == 60));
    }

    #[test]
    fn second_frame_is_delta() {
        let native = Resolution::new(8, 8);
        let (mut p, _hub) = processor(native);
        p.on_color_frame(color(native, [0, 0, 0]));
        p.process_depth(&depth(native, 400, 0)).unwrap();
        let bytes = p.process_depth(&depth(native, 404, 1)).unwrap();

        let mut codec = ZstdCompressor::new(DEFAULT_LEVEL, DEFAULT_WINDOW_LOG).unwrap();
        let cells = p.grid().cells();
        let raw = codec.decompress(&bytes, packed_len(cells)).unwrap();
        let frame = PackedFrame::parse(&raw, cells).unwrap();
        assert!(!frame.is_keyframe);
        assert!(frame.depth.iter().all(|&d| d == 1));
    }

    #[test]
    fn codec_failure_drops_frame_and_forces_keyframe() {
        let native = Resolution::new(8, 8);
        let (hub, handle) = BroadcastHub::new(HubConfig::default());
        let grid = Arc::new(IndexGrid::new(native, 2).unwrap());
        let mut p = FrameProcessor::with_compressor(
            grid,
            EncoderConfig::default(),
            Box::new(FailingCodec),
            handle,
            CancellationToken::new(),
        )
        .unwrap();
        p.on_color_frame(color(native, [1, 2, 3]));
        p.on_depth_frame(depth(native, 0, 0));
        p.on_depth_frame(depth(native, 0, 1));
        assert_eq!(p.stats().dropped, 2);
        assert_eq!(p.stats().broadcast, 0);
        assert!(p.encoder.next_is_keyframe());
        drop(hub);
    }

    #[test]
    fn callbacks_hand_off_to_hub() {
        let native = Resolution::new(8, 8);
        let (hub, handle) = BroadcastHub::new(HubConfig::default());
        let mut p =
            FrameProcessor::new(&PipelineConfig::default(), native, handle, CancellationToken::new())
                .unwrap();

        p.on_depth_frame(depth(native, 0, 0));
        p.on_color_frame(color(native, [1, 2, 3]));
        p.on_depth_frame(depth(native, 0, 1));
        p.on_depth_frame(depth(native, 0, 2));

        let stats = p.stats();
        assert_eq!(stats.depth_frames, 3);
        assert_eq!(stats.skipped_no_color, 1);
        assert_eq!(stats.broadcast, 2);
        assert_eq!(stats.keyframes, 1);

        let mut hub = hub;
        let mut broadcasts = 0;
        while let Ok(cmd) = hub.try_next_command() {
            assert!(matches!(cmd, HubCommand::Broadcast { binary: true, .. }));
            broadcasts += 1;
        }
        assert_eq!(broadcasts, 2);
    }

    #[test]
    fn handoff_after_hub_stops_is_counted() {
        let native = Resolution::new(8, 8);
        let (hub, handle) = BroadcastHub::new(HubConfig::default());
        drop(hub);
        let mut p =
            FrameProcessor::new(&PipelineConfig::default(), native, handle, CancellationToken::new())
                .unwrap();
        p.on_color_frame(color(native, [1, 2, 3]));
        p.on_depth_frame(depth(native, 0, 0));
        assert_eq!(p.stats().handoff_failures, 1);
    }

    #[test]
    fn mismatched_color_is_ignored() {
        let native = Resolution::new(8, 8);
        let (mut p, _hub) = processor(native);
        p.on_color_frame(color(Resolution::new(4, 4), [1, 2, 3]));
        assert!(!p.has_color());
        assert_eq!(p.stats().dropped, 1);
    }

    #[test]
    fn short_color_buffer_is_dropped_not_paired() {
        let native = Resolution::new(16, 16);
        let (mut p, _hub) = processor(native);
        p.on_color_frame(ColorFrame {
            resolution: native,
            data: vec![0; 10],
            timestamp: 0,
        });
        assert!(!p.has_color());

        p.on_depth_frame(depth(native, 400, 0));
        let stats = p.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.skipped_no_color, 1);
        assert_eq!(stats.broadcast, 0);

        // A good color frame afterwards restores the pipeline.
        p.on_color_frame(color(native, [9, 9, 9]));
        p.on_depth_frame(depth(native, 400, 1));
        assert_eq!(p.stats().broadcast, 1);
    }

    #[test]
    fn tick_follows_cancellation() {
        let native = Resolution::new(8, 8);
        let (_hub, handle) = BroadcastHub::new(HubConfig::default());
        let token = CancellationToken::new();
        let mut p =
            FrameProcessor::new(&PipelineConfig::default(), native, handle, token.clone()).unwrap();
        assert!(p.on_tick());
        token.cancel();
        assert!(!p.on_tick());
    }
}
