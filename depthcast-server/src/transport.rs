//! WebSocket transport adapter.
//!
//! Accepts consumer connections, upgrades them with `tokio-tungstenite`
//! and maps connect/disconnect onto hub `register`/`unregister`. Each
//! connection gets an outbound queue; the hub only ever enqueues into
//! it through [`WsConsumer::send`], and a per-connection writer task
//! drains it into the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use depthcast_core::{Consumer, ConsumerId, DepthcastError, HubHandle, QueuePolicy};

// ── Outbound queue ───────────────────────────────────────────────

/// One queued payload. The queue holds the shared `Bytes` so the hub
/// task only bumps a refcount per consumer.
#[derive(Debug)]
struct Outgoing {
    payload: Bytes,
    binary: bool,
}

impl Outgoing {
    // TODO: tungstenite 0.26 backs `Message::Binary` with `Bytes`; once
    // on it, hand the payload over without this copy.
    fn into_message(self) -> Message {
        if self.binary {
            Message::Binary(self.payload.to_vec())
        } else {
            Message::Text(String::from_utf8_lossy(&self.payload).into_owned())
        }
    }
}

enum OutboundTx {
    Unbounded(mpsc::UnboundedSender<Outgoing>),
    Bounded(mpsc::Sender<Outgoing>),
}

enum OutboundRx {
    Unbounded(mpsc::UnboundedReceiver<Outgoing>),
    Bounded(mpsc::Receiver<Outgoing>),
}

impl OutboundRx {
    async fn recv(&mut self) -> Option<Outgoing> {
        match self {
            OutboundRx::Unbounded(rx) => rx.recv().await,
            OutboundRx::Bounded(rx) => rx.recv().await,
        }
    }
}

fn outbound(policy: QueuePolicy) -> (OutboundTx, OutboundRx) {
    match policy {
        QueuePolicy::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (OutboundTx::Unbounded(tx), OutboundRx::Unbounded(rx))
        }
        QueuePolicy::Bounded(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (OutboundTx::Bounded(tx), OutboundRx::Bounded(rx))
        }
    }
}

// ── WsConsumer ───────────────────────────────────────────────────

/// Hub-facing side of one WebSocket connection.
pub struct WsConsumer {
    id: ConsumerId,
    peer: String,
    tx: OutboundTx,
}

impl Consumer for WsConsumer {
    fn id(&self) -> ConsumerId {
        self.id
    }

    fn peer(&self) -> &str {
        &self.peer
    }

    fn send(&self, payload: Bytes, binary: bool) -> Result<(), DepthcastError> {
        let message = Outgoing { payload, binary };
        let id = self.id.get();
        match &self.tx {
            OutboundTx::Unbounded(tx) => tx
                .send(message)
                .map_err(|_| DepthcastError::ConsumerGone(id)),
            OutboundTx::Bounded(tx) => tx.try_send(message).map_err(|e| match e {
                TrySendError::Full(_) => DepthcastError::ConsumerLagging(id),
                TrySendError::Closed(_) => DepthcastError::ConsumerGone(id),
            }),
        }
    }
}

// ── WsTransport ──────────────────────────────────────────────────

/// Listening endpoint for consumers.
pub struct WsTransport {
    listener: TcpListener,
    hub: HubHandle,
    policy: QueuePolicy,
}

impl WsTransport {
    /// Bind the listener. Failure here is fatal to startup.
    pub async fn bind(
        addr: &str,
        hub: HubHandle,
        policy: QueuePolicy,
    ) -> Result<Self, DepthcastError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| DepthcastError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            hub,
            policy,
        })
    }

    /// Address actually bound (resolves port `0`).
    pub fn local_addr(&self) -> Result<SocketAddr, DepthcastError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept consumers until `shutdown` fires. Each connection is
    /// served on its own task and closed when `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            let accept = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.listener.accept() => result,
            };

            let (stream, peer) = match accept {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };

            tokio::spawn(serve_consumer(
                stream,
                peer,
                self.hub.clone(),
                self.policy,
                shutdown.clone(),
            ));
        }
        info!("consumer listener stopped");
    }
}

/// Drive one consumer connection from handshake to disconnect.
///
/// The writer task drains the consumer's queue into the socket and ends
/// once the hub drops the consumer. This task reads until the peer
/// closes or `shutdown` fires.
async fn serve_consumer(
    stream: TcpStream,
    peer: SocketAddr,
    hub: HubHandle,
    policy: QueuePolicy,
    shutdown: CancellationToken,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!("websocket handshake with {peer} failed: {e}");
            return;
        }
    };
    let (mut sink, mut source) = ws.split();

    let (tx, mut rx) = outbound(policy);
    let consumer = Arc::new(WsConsumer {
        id: ConsumerId::next(),
        peer: peer.to_string(),
        tx,
    });
    let id = consumer.id();
    if hub.register(consumer).is_err() {
        return;
    }

    tokio::spawn(async move {
        while let Some(outgoing) = rx.recv().await {
            if let Err(e) = sink.send(outgoing.into_message()).await {
                debug!("send to {peer} failed: {e}");
                return;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        let incoming = tokio::select! {
            _ = shutdown.cancelled() => break,
            incoming = source.next() => incoming,
        };
        match incoming {
            Some(Ok(Message::Close(_))) | None => break,
            // Pongs are queued by tungstenite while reading.
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!("websocket error from {peer}: {e}");
                break;
            }
        }
    }

    let _ = hub.unregister(id);
}

// ── Tests ────────────────────────────────────────────────────────
