//! Error type for event handling.

use crate::{NodeId, SimTime};
use thiserror::Error;

/// Errors raised while running events.
///
/// Protocol anomalies (cycles, stale advertisements, orphan DAOs) are not errors;
/// they are recorded and the run continues. These variants indicate a broken
/// simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// An event referenced a node that was never created.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// An event reached a handler that cannot process it.
    #[error("Unexpected event at {time}: {event}")]
    UnexpectedEvent {
        /// Time of the event.
        time: SimTime,
        /// Description of the event.
        event: String,
    },

    /// An invariant check failed.
    #[error("Invariant violated at {time}: {detail}")]
    InvariantViolated {
        /// Time of the check.
        time: SimTime,
        /// What was violated.
        detail: String,
    },
}
