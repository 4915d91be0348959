//! Node placement and connectivity.

use crate::{ModelError, SimulationConfig};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rplsim_common::{NodeId, RNG_STREAM_PLACEMENT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in the deployment area, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

/// Planned positions of every node plus the link range.
///
/// Position `i` belongs to `NodeId(i)`. The topology is fixed for the run; which
/// nodes exist at a given time is tracked by the network, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    positions: Vec<Position>,
    connection_range: f64,
}

impl Topology {
    /// Build a topology from explicit positions.
    pub fn from_positions(positions: Vec<Position>, connection_range: f64) -> Self {
        Topology {
            positions,
            connection_range,
        }
    }

    /// Place `config.node_count` nodes by rejection sampling.
    pub fn generate(config: &SimulationConfig) -> Result<Self, ModelError> {
        let positions = place_nodes(config)?;
        Ok(Self::from_positions(positions, config.connection_range))
    }

    /// Number of planned nodes.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no node is planned.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// All planned positions in node order.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Planned position of `node`.
    pub fn position(&self, node: NodeId) -> Option<Position> {
        self.positions.get(node.index()).copied()
    }

    /// Maximum link distance.
    pub fn connection_range(&self) -> f64 {
        self.connection_range
    }

    /// Distance between two planned nodes.
    pub fn distance(&self, a: NodeId, b: NodeId) -> Option<f64> {
        Some(self.position(a)?.distance_to(&self.position(b)?))
    }

    /// Whether two planned nodes can hear each other (`distance <= range`).
    pub fn in_range(&self, a: NodeId, b: NodeId) -> bool {
        self.distance(a, b)
            .is_some_and(|d| d <= self.connection_range)
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Draw node positions uniformly in the area, rejecting any closer than
/// `minimum_distance` to an already placed node.
///
/// Uses ChaCha8 stream [`RNG_STREAM_PLACEMENT`] of the configured seed, so the layout
/// depends only on the seed and the area parameters.
pub fn place_nodes(config: &SimulationConfig) -> Result<Vec<Position>, ModelError> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    rng.set_stream(RNG_STREAM_PLACEMENT);

    let attempts = config.protocol.max_placement_attempts;
    let mut placed: Vec<Position> = Vec::with_capacity(config.node_count);

    for node in 0..config.node_count {
        let mut found = None;
        for _ in 0..attempts {
            let candidate = Position::new(
                round4(rng.gen_range(0.0..=config.area_width)),
                round4(rng.gen_range(0.0..=config.area_height)),
            );
            if placed
                .iter()
                .all(|p| p.distance_to(&candidate) >= config.minimum_distance)
            {
                found = Some(candidate);
                break;
            }
        }
        let position = found.ok_or(ModelError::PlacementExhausted {
            node,
            attempts,
            minimum_distance: config.minimum_distance,
        })?;
        tracing::trace!("Placed node {} at {}", node, position);
        placed.push(position);
    }

    Ok(placed)
}
