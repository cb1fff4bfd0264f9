//! Integration tests: acquisition thread feeding the hub task, consumer
//! churn during broadcast, and ordered shutdown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use depthcast_core::pipeline::compress::{Compressor, DEFAULT_LEVEL, DEFAULT_WINDOW_LOG};
use depthcast_core::pipeline::{DepthReconstructor, PackedFrame, ZstdCompressor, packed_len};
use depthcast_core::{
    BroadcastHub, Consumer, ConsumerId, DepthcastError, FrameProcessor, FrameSource, HubConfig,
    HubHandle, PipelineConfig, Resolution, SyntheticSensor,
};
use tokio_util::sync::CancellationToken;

// ── Helpers ──────────────────────────────────────────────────────

/// Consumer that keeps every payload; flips to failing once `closed`.
struct Recorder {
    id: ConsumerId,
    closed: Mutex<bool>,
    received: Mutex<Vec<Bytes>>,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            id: ConsumerId::next(),
            closed: Mutex::new(false),
            received: Mutex::new(Vec::new()),
        })
    }

    fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }

    fn received(&self) -> Vec<Bytes> {
        self.received.lock().unwrap().clone()
    }
}

impl Consumer for Recorder {
    fn id(&self) -> ConsumerId {
        self.id
    }

    fn peer(&self) -> &str {
        "recorder"
    }

    fn send(&self, payload: Bytes, _binary: bool) -> Result<(), DepthcastError> {
        if *self.closed.lock().unwrap() {
            return Err(DepthcastError::ConsumerGone(self.id.get()));
        }
        self.received.lock().unwrap().push(payload);
        Ok(())
    }
}

fn start_hub() -> (HubHandle, CancellationToken, tokio::task::JoinHandle<()>) {
    let (hub, handle) = BroadcastHub::new(HubConfig::default());
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(hub.run(shutdown.clone()));
    (handle, shutdown, task)
}

/// Run `sensor` to completion on a blocking thread.
async fn acquire(
    mut sensor: SyntheticSensor,
    hub: HubHandle,
    stop: CancellationToken,
) -> FrameProcessor {
    tokio::task::spawn_blocking(move || {
        let mut processor =
            FrameProcessor::new(&PipelineConfig::default(), sensor.resolution(), hub, stop)
                .unwrap();
        sensor.run(&mut processor).unwrap();
        processor
    })
    .await
    .unwrap()
}

// ── End-to-end ───────────────────────────────────────────────────

#[tokio::test]
async fn test_frames_reach_every_consumer_in_order() {
    let (hub, shutdown, task) = start_hub();
    let a = Recorder::new();
    let b = Recorder::new();
    hub.register(a.clone()).unwrap();
    hub.register(b.clone()).unwrap();

    let sensor = SyntheticSensor::new(Resolution::new(640, 480), 1000).with_frame_limit(35);
    let processor = acquire(sensor, hub.clone(), CancellationToken::new()).await;
    assert_eq!(processor.stats().broadcast, 35);
    assert_eq!(processor.stats().keyframes, 2);

    // Flush queued broadcasts through the hub task.
    assert_eq!(hub.consumer_count().await.unwrap(), 2);

    let frames = a.received();
    assert_eq!(frames, b.received());
    assert_eq!(frames.len(), 35);

    // Decode on the consumer side and rebuild absolute depth.
    let cells = processor.grid().cells();
    let mut codec = ZstdCompressor::new(DEFAULT_LEVEL, DEFAULT_WINDOW_LOG).unwrap();
    let mut reconstructor = DepthReconstructor::new();
    let reference = SyntheticSensor::new(Resolution::new(640, 480), 1000);
    for (t, bytes) in frames.iter().enumerate() {
        let raw = codec.decompress(bytes, packed_len(cells)).unwrap();
        assert_eq!(raw.len(), 38_405);
        let frame = PackedFrame::parse(&raw, cells).unwrap();
        assert_eq!(frame.is_keyframe, t % 30 == 0, "frame {t}");

        let depth = reconstructor.apply(frame.is_keyframe, frame.depth).unwrap();
        let expected = reference.depth_frame(t as u64);
        let grid = processor.grid();
        let (row, col) = grid.native_coord(7, 11);
        let sample = expected.sample(col, row);
        assert_eq!(depth[7 * grid.width() + 11], (sample.min(1023) >> 2) as u8);
    }

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_no_color_means_no_broadcasts() {
    let (hub, shutdown, task) = start_hub();
    let consumer = Recorder::new();
    hub.register(consumer.clone()).unwrap();

    let sensor = SyntheticSensor::new(Resolution::new(64, 48), 1000)
        .without_color()
        .with_frame_limit(50);
    let processor = acquire(sensor, hub.clone(), CancellationToken::new()).await;

    assert_eq!(processor.stats().depth_frames, 50);
    assert_eq!(processor.stats().skipped_no_color, 50);
    assert_eq!(processor.stats().broadcast, 0);

    hub.consumer_count().await.unwrap();
    assert!(consumer.received().is_empty());

    shutdown.cancel();
    task.await.unwrap();
}

// ── Consumer churn ───────────────────────────────────────────────

#[tokio::test]
async fn test_disconnect_mid_broadcast() {
    let (hub, shutdown, task) = start_hub();
    let stays = Recorder::new();
    let leaves = Recorder::new();
    hub.register(stays.clone()).unwrap();
    hub.register(leaves.clone()).unwrap();

    hub.broadcast(Bytes::from_static(b"one"), true).unwrap();
    // Transport torn down before the hub learns about it.
    leaves.close();
    hub.broadcast(Bytes::from_static(b"two"), true).unwrap();
    assert_eq!(hub.consumer_count().await.unwrap(), 2);

    // Disconnect notification arrives.
    hub.unregister(leaves.id()).unwrap();
    hub.broadcast(Bytes::from_static(b"three"), true).unwrap();
    assert_eq!(hub.consumer_count().await.unwrap(), 1);

    assert_eq!(stays.received().len(), 3);
    assert_eq!(leaves.received(), vec![Bytes::from_static(b"one")]);

    shutdown.cancel();
    task.await.unwrap();
}

// ── Shutdown ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_acquisition_stops_before_hub() {
    let (hub, shutdown, task) = start_hub();
    let consumer = Recorder::new();
    hub.register(consumer.clone()).unwrap();

    let stop = CancellationToken::new();
    let acquisition = tokio::spawn(acquire(
        SyntheticSensor::new(Resolution::new(64, 48), 200),
        hub.clone(),
        stop.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.cancel();
    let processor = tokio::time::timeout(Duration::from_secs(5), acquisition)
        .await
        .expect("acquisition did not stop")
        .unwrap();

    // Every frame the processor handed off is delivered before the hub stops.
    let sent = processor.stats().broadcast;
    assert!(sent > 0);
    hub.consumer_count().await.unwrap();
    assert_eq!(consumer.received().len() as u64, sent);

    shutdown.cancel();
    task.await.unwrap();
    assert!(hub.is_closed());
}
