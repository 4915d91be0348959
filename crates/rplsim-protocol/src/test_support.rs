//! Helpers for protocol unit tests.

use crate::Network;
use rplsim_common::{NodeId, RecordFilter, RecordLog, SimContext, SimTime};
use rplsim_model::{Position, SimulationConfig, Topology};

/// A network over explicit positions with disruption switched off.
pub fn network(positions: &[(f64, f64)]) -> Network {
    let mut config = SimulationConfig {
        node_count: positions.len(),
        ..Default::default()
    };
    config.protocol.disruption_probability = 0.0;
    network_with(config, positions)
}

pub fn network_with(config: SimulationConfig, positions: &[(f64, f64)]) -> Network {
    let positions = positions
        .iter()
        .map(|&(x, y)| Position::new(x, y))
        .collect();
    let topology = Topology::from_positions(positions, config.connection_range);
    Network::new(config, topology).unwrap()
}

/// A started run with an empty record filter.
pub fn start(network: &Network) -> SimContext {
    let mut ctx = SimContext::new(network.config().seed, RecordLog::new(RecordFilter::none()));
    network.start(&mut ctx);
    ctx
}

pub fn secs(s: f64) -> SimTime {
    SimTime::from_secs(s)
}

pub fn parent(network: &Network, id: u32) -> Option<NodeId> {
    network.node(NodeId(id)).and_then(|n| n.parent)
}

pub fn prefix(network: &Network, id: u32) -> String {
    network
        .node(NodeId(id))
        .map(|n| n.prefix.to_string())
        .unwrap_or_default()
}
