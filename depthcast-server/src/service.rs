//! Depthcast service lifecycle.
//!
//! Wires the acquisition thread, the broadcast hub task and the
//! WebSocket listener together, and tears them down in order: the
//! acquisition side stops first, then the hub and listener.

use std::net::SocketAddr;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use depthcast_core::{
    BroadcastHub, DepthcastError, FrameProcessor, FrameSource, HubHandle, SyntheticSensor,
    ThroughputReport,
};

use crate::config::ServerConfig;
use crate::transport::WsTransport;

// ── BoundService ─────────────────────────────────────────────────

/// Listener and hub that exist but are not running yet.
pub struct BoundService {
    hub: BroadcastHub,
    handle: HubHandle,
    transport: WsTransport,
}

impl BoundService {
    /// Address consumers connect to.
    pub fn local_addr(&self) -> Result<SocketAddr, DepthcastError> {
        self.transport.local_addr()
    }

    /// Throughput reports published by the hub once it runs.
    pub fn reports(&self) -> watch::Receiver<ThroughputReport> {
        self.hub.subscribe_reports()
    }

    pub fn hub(&self) -> &HubHandle {
        &self.handle
    }
}

// ── DepthcastService ─────────────────────────────────────────────

/// The top-level depthcast service.
pub struct DepthcastService {
    config: ServerConfig,
    acquisition: CancellationToken,
    service: CancellationToken,
}

impl DepthcastService {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            acquisition: CancellationToken::new(),
            service: CancellationToken::new(),
        }
    }

    /// Token that stops the service when cancelled. Cancelling it only
    /// stops acquisition; the hub and listener follow once the
    /// acquisition thread has returned.
    pub fn stop_handle(&self) -> CancellationToken {
        self.acquisition.clone()
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.acquisition.cancel();
    }

    /// Whether a stop has been requested.
    pub fn is_stopping(&self) -> bool {
        self.acquisition.is_cancelled()
    }

    /// Bind the consumer listener and create the hub.
    pub async fn bind(&self) -> Result<BoundService, DepthcastError> {
        let (hub, handle) = BroadcastHub::new(self.config.to_hub_config());
        let addr = self.config.listen_addr();
        let transport =
            WsTransport::bind(&addr, handle.clone(), self.config.queue_policy()).await?;
        info!("consumer listener on {}", transport.local_addr()?);
        Ok(BoundService {
            hub,
            handle,
            transport,
        })
    }

    /// Run with the synthetic sensor described by the config.
    pub async fn run(&self) -> Result<(), DepthcastError> {
        let bound = self.bind().await?;
        let sensor = SyntheticSensor::new(self.config.resolution(), self.config.sensor.fps);
        self.serve(bound, sensor).await
    }

    /// Run until `source` returns or a stop is requested.
    ///
    /// 1. Starts the hub task and the accept loop.
    /// 2. Drives `source` on a blocking thread through a `FrameProcessor`.
    /// 3. Once the source returns, stops the hub and listener.
    pub async fn serve<S>(&self, bound: BoundService, mut source: S) -> Result<(), DepthcastError>
    where
        S: FrameSource + 'static,
    {
        let BoundService {
            hub,
            handle,
            transport,
        } = bound;

        let mut processor = FrameProcessor::new(
            &self.config.to_pipeline_config(),
            source.resolution(),
            handle,
            self.acquisition.clone(),
        )?;
        info!(
            "downsampled grid {}x{} (stride {})",
            processor.grid().width(),
            processor.grid().height(),
            processor.grid().stride()
        );

        let hub_task = tokio::spawn(hub.run(self.service.clone()));
        let accept_task = tokio::spawn(transport.run(self.service.clone()));

        let acquisition = tokio::task::spawn_blocking(move || {
            let result = source.run(&mut processor);
            (result, processor.stats())
        })
        .await;

        // Acquisition has stopped handing off frames; the service side
        // can go now.
        self.service.cancel();
        let _ = hub_task.await;
        let _ = accept_task.await;

        let (result, stats) = acquisition
            .map_err(|e| DepthcastError::Other(format!("acquisition thread failed: {e}")))?;
        info!(
            "acquisition stopped: {} depth frames, {} broadcast ({} keyframes), {} skipped, {} dropped",
            stats.depth_frames,
            stats.broadcast,
            stats.keyframes,
            stats.skipped_no_color,
            stats.dropped
        );
        if let Err(e) = &result {
            error!("acquisition failed: {e}");
        }
        info!("depthcast service stopped");
        result
    }
}

// ── Tests ────────────────────────────────────────────────────────
