//! Transport boundary for connected consumers.
//!
//! The hub never talks to sockets. A transport adapter wraps each live
//! connection in a [`Consumer`] whose [`send`](Consumer::send) only
//! enqueues; the adapter's own writer drains the queue.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::error::DepthcastError;

// ── ConsumerId ───────────────────────────────────────────────────

/// Process-unique identity of a consumer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsumerId(u64);

impl ConsumerId {
    /// Allocate the next identity.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Consumer ─────────────────────────────────────────────────────

/// A live consumer as seen by the hub.
pub trait Consumer: Send + Sync {
    /// Identity used for registry uniqueness.
    fn id(&self) -> ConsumerId;

    /// Human-readable peer description for logs.
    fn peer(&self) -> &str;

    /// Queue `payload` for delivery. Must not block. An error affects
    /// this consumer only.
    fn send(&self, payload: Bytes, binary: bool) -> Result<(), DepthcastError>;
}

// ── QueuePolicy ──────────────────────────────────────────────────

/// Per-consumer outbound queue policy used by transport adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Fire-and-forget: never drops, memory grows with a slow consumer.
    #[default]
    Unbounded,
    /// Holds at most `n` frames; newer frames are dropped while full.
    Bounded(usize),
}

impl QueuePolicy {
    /// `0` means unbounded.
    pub fn from_capacity(capacity: usize) -> Self {
        match capacity {
            0 => QueuePolicy::Unbounded,
            n => QueuePolicy::Bounded(n),
        }
    }
}
