//! Scheduled events and protocol messages.

use crate::{EventId, NodeId, Prefix, SimTime};
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// Protocol Messages
// ============================================================================

/// RPL control message delivered to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// DODAG Information Solicitation.
    Dis {
        /// Node asking for advertisements.
        sender: NodeId,
    },
    /// DODAG Information Object.
    Dio {
        /// Advertising node.
        sender: NodeId,
        /// The sender's prefix when the DIO was sent.
        prefix: Prefix,
    },
    /// Destination Advertisement Object.
    Dao {
        /// Immediate child that forwarded the advertisement.
        child: NodeId,
        /// Prefix of the node that originated the advertisement.
        prefix: Prefix,
    },
}

impl Message {
    /// Short name used in traces.
    pub fn name(&self) -> &'static str {
        match self {
            Message::Dis { .. } => "DIS",
            Message::Dio { .. } => "DIO",
            Message::Dao { .. } => "DAO",
        }
    }
}

// ============================================================================
// Event Payloads
// ============================================================================

/// Per-node activity resumed by a timer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Start of neighbor discovery.
    DiscoveryStart,
    /// DIS fan-out after the discovery delay.
    DiscoveryBroadcast,
    /// Periodic DIO advertisement.
    DioInterval,
    /// Trickle-like re-discovery timer.
    Trickle,
    /// Disruption injector check.
    Disruption,
}

/// What an event does when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// Create the node at this index of the planned topology.
    CreateNode {
        /// Index of the node to create.
        index: usize,
    },
    /// Resume one of a node's activities.
    Timer {
        /// Node owning the activity.
        node: NodeId,
        /// Which activity resumes.
        kind: TimerKind,
    },
    /// Deliver a protocol message.
    Deliver {
        /// Receiving node.
        to: NodeId,
        /// The message.
        message: Message,
    },
}

impl EventPayload {
    /// Node whose behavior this event resumes, if any.
    pub fn target(&self) -> Option<NodeId> {
        match self {
            EventPayload::CreateNode { .. } => None,
            EventPayload::Timer { node, .. } => Some(*node),
            EventPayload::Deliver { to, .. } => Some(*to),
        }
    }
}

impl fmt::Display for EventPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventPayload::CreateNode { index } => write!(f, "CreateNode({})", index),
            EventPayload::Timer { node, kind } => write!(f, "Timer({}, {:?})", node, kind),
            EventPayload::Deliver { to, message } => write!(f, "Deliver({} -> {})", message.name(), to),
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// A scheduled resumption.
#[derive(Debug, Clone)]
pub struct Event {
    /// Scheduler-assigned id; lower ids were scheduled earlier.
    pub id: EventId,
    /// When the event fires.
    pub time: SimTime,
    /// What happens when it fires.
    pub payload: EventPayload,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap: earliest time first, then lowest id (FIFO).
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}
