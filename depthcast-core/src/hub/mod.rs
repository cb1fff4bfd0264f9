//! # Broadcast hub
//!
//! Consumer registry, fan-out and throughput metering, all owned by a
//! single Tokio task.
//!
//! | Module       | Purpose                                            |
//! |------------- |----------------------------------------------------|
//! | `consumer`   | Transport boundary trait and queue policy          |
//! | `registry`   | Identity-keyed set of live consumers               |
//! | `throughput` | Per-window byte counter and report                 |
//! | `broadcast`  | Hub task, command channel and handle               |

pub mod broadcast;
pub mod consumer;
pub mod registry;
pub mod throughput;

pub use broadcast::{BroadcastHub, HubCommand, HubConfig, HubHandle};
pub use consumer::{Consumer, ConsumerId, QueuePolicy};
pub use registry::ClientRegistry;
pub use throughput::{ThroughputCounter, ThroughputReport};
