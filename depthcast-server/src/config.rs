//! Configuration for the depthcast server.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use depthcast_core::hub::HubConfig;
use depthcast_core::pipeline::{EncoderConfig, PipelineConfig, Resolution};
use depthcast_core::QueuePolicy;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Sensor settings.
    pub sensor: SensorConfig,
    /// Encoding pipeline settings.
    pub pipeline: PipelineSection,
    /// Broadcast hub settings.
    pub hub: HubSection,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the WebSocket listener binds to.
    pub bind_address: String,
    /// WebSocket listening port.
    pub port: u16,
}

/// Sensor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Native frame width.
    pub width: usize,
    /// Native frame height.
    pub height: usize,
    /// Frames per second produced by the source.
    pub fps: u32,
}

/// Encoding pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Keep every `stride`-th sample in both directions.
    pub stride: usize,
    /// Emit a keyframe every this many frames.
    pub keyframe_interval: u32,
    /// Sensor depth resolution in bits.
    pub depth_bits: u8,
    /// Compression window as a power of two.
    pub window_log: u32,
    /// zstd compression level.
    pub compression_level: i32,
}

/// Broadcast hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSection {
    /// Throughput report period in milliseconds.
    pub report_interval_ms: u64,
    /// Per-consumer outbound queue length; 0 = unbounded.
    pub consumer_queue: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

/// Why a config file could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 9000,
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            stride: 4,
            keyframe_interval: 30,
            depth_bits: 10,
            window_log: 16,
            compression_level: 3,
        }
    }
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            report_interval_ms: 1000,
            consumer_queue: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns `Ok(None)` when the file does not exist. Nothing is logged
    /// here: this runs before the subscriber is installed.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// `host:port` for the WebSocket listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.network.bind_address, self.network.port)
    }

    /// Native sensor resolution.
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.sensor.width, self.sensor.height)
    }

    /// Convert pipeline settings into a `PipelineConfig`.
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        let p = &self.pipeline;
        PipelineConfig {
            stride: p.stride.max(1),
            encoder: EncoderConfig {
                depth_bits: p.depth_bits.clamp(8, 16),
                keyframe_interval: p.keyframe_interval.max(1),
            },
            compression_level: p.compression_level.clamp(1, 19),
            window_log: p.window_log.clamp(10, 27),
        }
    }

    /// Convert hub settings into a `HubConfig`.
    pub fn to_hub_config(&self) -> HubConfig {
        HubConfig {
            report_interval: Duration::from_millis(self.hub.report_interval_ms.max(100)),
        }
    }

    /// Outbound queue policy for each consumer.
    pub fn queue_policy(&self) -> QueuePolicy {
        QueuePolicy::from_capacity(self.hub.consumer_queue)
    }
}

// ── Tests ────────────────────────────────────────────────────────
