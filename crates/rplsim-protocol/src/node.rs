//! Per-node protocol state.

use crate::Trickle;
use rplsim_common::{NodeId, Prefix, SimTime};
use rplsim_model::Position;
use serde::Serialize;
use std::collections::BTreeSet;

/// Protocol state of one node.
///
/// The parent is an id into the owning [`Network`](crate::Network), never a reference.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    /// Rendering hint drawn at creation.
    pub color: [f64; 3],
    pub created_at: SimTime,
    /// Link-reachable nodes. Always mirrored on the other side.
    pub neighbors: BTreeSet<NodeId>,
    /// Neighbors severed by the most recent disruption.
    pub lost_neighbors: BTreeSet<NodeId>,
    pub parent: Option<NodeId>,
    pub prefix: Prefix,
    pub trickle: Trickle,
}

impl Node {
    /// A fresh, unattached node carrying its base prefix.
    pub fn new(
        id: NodeId,
        position: Position,
        color: [f64; 3],
        created_at: SimTime,
        trickle: Trickle,
    ) -> Self {
        Node {
            id,
            position,
            color,
            created_at,
            neighbors: BTreeSet::new(),
            lost_neighbors: BTreeSet::new(),
            parent: None,
            prefix: Prefix::root(id),
            trickle,
        }
    }

    /// Whether the node has a parent.
    pub fn is_attached(&self) -> bool {
        self.parent.is_some()
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            name: self.id.to_string(),
            position: self.position,
            color: self.color,
            created_at: self.created_at.as_secs_f64(),
            prefix: self.prefix.clone(),
            parent: self.parent,
            neighbors: self.neighbors.iter().copied().collect(),
            lost_neighbors: self.lost_neighbors.iter().copied().collect(),
            trickle_interval: self.trickle.interval().as_secs_f64(),
        }
    }
}

/// Frozen view of a node for reports and rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub position: Position,
    pub color: [f64; 3],
    /// Creation time in seconds.
    pub created_at: f64,
    pub prefix: Prefix,
    pub parent: Option<NodeId>,
    pub neighbors: Vec<NodeId>,
    pub lost_neighbors: Vec<NodeId>,
    /// Trickle interval in seconds.
    pub trickle_interval: f64,
}
