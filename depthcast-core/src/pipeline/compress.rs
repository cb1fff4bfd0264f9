//! Lossless compression of packed frames.
//!
//! The pipeline treats the codec as a black box behind [`Compressor`]:
//! deterministic for identical input, no knowledge of the payload layout.
//! The bundled [`ZstdCompressor`] bounds its match window to
//! `2^window_log` bytes.

use crate::error::DepthcastError;
use zstd::stream::raw::CParameter;

/// Default log2 window size (64 KiB).
pub const DEFAULT_WINDOW_LOG: u32 = 16;

/// Default zstd compression level.
pub const DEFAULT_LEVEL: i32 = 3;

/// Lossless byte codec used by the pipeline.
pub trait Compressor: Send {
    /// Compress `data`. A failure drops this frame only.
    fn compress(&mut self, data: &[u8]) -> Result<Vec<u8>, DepthcastError>;

    /// Inverse of [`compress`](Self::compress); `capacity` bounds the output.
    fn decompress(&mut self, data: &[u8], capacity: usize) -> Result<Vec<u8>, DepthcastError>;
}

// ── ZstdCompressor ───────────────────────────────────────────────

/// zstd codec with a fixed window size.
pub struct ZstdCompressor {
    inner: zstd::bulk::Compressor<'static>,
}

impl ZstdCompressor {
    /// Create a compressor with `level` and a `2^window_log` byte window.
    pub fn new(level: i32, window_log: u32) -> Result<Self, DepthcastError> {
        let mut inner = zstd::bulk::Compressor::new(level).map_err(codec_error)?;
        inner
            .set_parameter(CParameter::WindowLog(window_log))
            .map_err(codec_error)?;
        Ok(Self { inner })
    }
}

impl Compressor for ZstdCompressor {
    fn compress(&mut self, data: &[u8]) -> Result<Vec<u8>, DepthcastError> {
        self.inner.compress(data).map_err(codec_error)
    }

    fn decompress(&mut self, data: &[u8], capacity: usize) -> Result<Vec<u8>, DepthcastError> {
        zstd::bulk::decompress(data, capacity).map_err(codec_error)
    }
}

fn codec_error(e: std::io::Error) -> DepthcastError {
    DepthcastError::Compression(e.to_string())
}

// ── Tests ────────────────────────────────────────────────────────
