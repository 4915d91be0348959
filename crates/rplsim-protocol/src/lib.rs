//! RPL-like DODAG formation protocol.
//!
//! A [`Network`] owns every [`Node`] and implements
//! [`EventHandler`](rplsim_common::EventHandler): each scheduled event resumes one
//! node activity or delivers one message. Each node runs four independent
//! activities:
//! - neighbor discovery (DIS fan-out after a short delay),
//! - the periodic DIO advertisement loop,
//! - the trickle-like re-discovery timer ([`Trickle`]),
//! - the random disruption injector.
//!
//! DIO handling selects parents and derives prefixes; DAO handling registers
//! prefixes upward. Both drop advertisements whose prefix path suggests a loop.
//! [`invariants`] checks the structural properties a run must preserve.

mod disruption;
pub mod invariants;
mod network;
mod node;
mod protocol;
mod trickle;

#[cfg(test)]
mod test_support;

pub use invariants::InvariantViolation;
pub use network::Network;
pub use node::{Node, NodeSnapshot};
pub use trickle::Trickle;
