//! End-to-end tests over a real WebSocket connection.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use depthcast_core::pipeline::compress::{Compressor, DEFAULT_LEVEL, DEFAULT_WINDOW_LOG};
use depthcast_core::pipeline::{PackedFrame, ZstdCompressor, packed_len};
use depthcast_core::{HubHandle, Resolution, SyntheticSensor};
use depthcast_server::config::ServerConfig;
use depthcast_server::service::DepthcastService;

fn local_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.network.bind_address = "127.0.0.1".into();
    config.network.port = 0;
    config
}

async fn wait_for_consumers(hub: &HubHandle, expected: usize) {
    for _ in 0..500 {
        if hub.consumer_count().await.unwrap() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("hub never reached {expected} consumers");
}

#[tokio::test]
async fn test_client_receives_decodable_frames() {
    let svc = Arc::new(DepthcastService::new(local_config()));
    let bound = svc.bind().await.unwrap();
    let addr = bound.local_addr().unwrap();

    let sensor = SyntheticSensor::new(Resolution::new(64, 48), 200);
    let runner = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.serve(bound, sensor).await })
    };

    let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

    // 64x48 at stride 4 gives a 16x12 grid.
    let cells = 16 * 12;
    let mut codec = ZstdCompressor::new(DEFAULT_LEVEL, DEFAULT_WINDOW_LOG).unwrap();
    let mut frames = 0;
    while frames < 3 {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("no frame within 5s")
            .unwrap()
            .unwrap();
        if let Message::Binary(bytes) = message {
            let raw = codec.decompress(&bytes, packed_len(cells)).unwrap();
            assert_eq!(raw.len(), 5 + 2 * cells);
            let frame = PackedFrame::parse(&raw, cells).unwrap();
            assert_eq!(frame.depth.len(), cells);
            assert_eq!(frame.luminance.len(), cells);
            frames += 1;
        }
    }

    svc.stop();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("service did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_disconnect_unregisters_consumer() {
    let svc = Arc::new(DepthcastService::new(local_config()));
    let bound = svc.bind().await.unwrap();
    let addr = bound.local_addr().unwrap();
    let hub = bound.hub().clone();

    let sensor = SyntheticSensor::new(Resolution::new(32, 24), 100);
    let runner = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.serve(bound, sensor).await })
    };

    let (mut first, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    let (_second, _) = connect_async(format!("ws://{addr}")).await.unwrap();
    wait_for_consumers(&hub, 2).await;

    first.send(Message::Close(None)).await.unwrap();
    drop(first);
    wait_for_consumers(&hub, 1).await;

    svc.stop();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("service did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_throughput_reports_are_published() {
    let mut config = local_config();
    config.hub.report_interval_ms = 100;
    let svc = Arc::new(DepthcastService::new(config));
    let bound = svc.bind().await.unwrap();
    let mut reports = bound.reports();

    let sensor = SyntheticSensor::new(Resolution::new(32, 24), 200);
    let runner = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.serve(bound, sensor).await })
    };

    let report = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            reports.changed().await.unwrap();
            let report = *reports.borrow_and_update();
            if report.frames > 0 {
                return report;
            }
        }
    })
    .await
    .expect("no throughput report within 5s");
    assert!(report.bytes_per_sec > 0);
    assert_eq!(report.consumers, 0);

    svc.stop();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("service did not stop")
        .unwrap()
        .unwrap();
}
