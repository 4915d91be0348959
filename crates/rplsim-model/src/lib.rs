//! Simulation configuration and topology for RPLSim.
//!
//! A run is fully described by a [`SimulationConfig`]. From it this crate derives the
//! planned node [`Topology`]: positions drawn by rejection sampling from a dedicated
//! ChaCha8 stream, plus the connectivity predicate the protocol uses for every
//! range check.

pub mod config;
pub mod error;
pub mod topology;

pub use config::{load_config, load_config_from_str, ProtocolParams, SimulationConfig};
pub use error::ModelError;
pub use topology::{place_nodes, Position, Topology};
