//! Common types for RPLSim.
//!
//! This crate holds everything the other crates agree on:
//! - [`SimTime`] and the identifier newtypes ([`NodeId`], [`EventId`])
//! - [`Prefix`], the hierarchical routing identifier carried by DIO/DAO messages
//! - [`Event`], [`EventPayload`] and [`Message`]
//! - [`Scheduler`], the time-ordered event queue with FIFO tie-break
//! - [`SimContext`], the handle an [`EventHandler`] uses to post events, draw
//!   randomness and emit [`EventRecord`]s
//!
//! ## Determinism
//!
//! All randomness flows from a single seed through explicit ChaCha8 streams, and
//! events at the same timestamp run in the order they were scheduled. Two runs with
//! the same seed and configuration produce identical record streams.

pub mod context;
pub mod error;
pub mod event;
pub mod prefix;
pub mod record;
pub mod scheduler;
pub mod time;

pub use context::{EventHandler, SimContext};
pub use error::SimError;
pub use event::{Event, EventPayload, Message, TimerKind};
pub use prefix::{Prefix, BASE_PREFIX};
pub use record::{EventRecord, RecordFilter, RecordKind, RecordLog};
pub use scheduler::Scheduler;
pub use time::SimTime;

use serde::{Deserialize, Serialize};
use std::fmt;

/// ChaCha stream used for node placement.
pub const RNG_STREAM_PLACEMENT: u64 = 0;
/// ChaCha stream used by protocol activities (trickle draws, disruption, colors).
pub const RNG_STREAM_PROTOCOL: u64 = 1;

/// Identifier of a simulated node; also its index in the network arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Create a node id.
    pub const fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Index into the node arena.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Prefix component derived from this id (two lowercase hex digits minimum).
    pub fn suffix(self) -> String {
        format!("{:02x}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node{:02}", self.0)
    }
}

/// Monotonic identifier assigned by the scheduler; doubles as the FIFO tie-break key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);
