//! Node registry and event dispatch.

use crate::{Node, NodeSnapshot, Trickle};
use rand::Rng;
use rand_distr::Bernoulli;
use rplsim_common::{
    Event, EventHandler, EventPayload, EventRecord, Message, NodeId, RecordKind, SimContext,
    SimError, TimerKind,
};
use rplsim_metrics::{metric_defs, MetricLabels};
use rplsim_model::{ModelError, SimulationConfig, Topology};
use tracing::{debug, trace};

/// Owns every node and runs their activities.
///
/// Nodes are created one at a time in topology order, so `NodeId(i)` is always at
/// index `i`. Handlers only ever mutate the node the event targets, plus the mirror
/// side of a link being added or removed.
#[derive(Debug)]
pub struct Network {
    pub(crate) config: SimulationConfig,
    pub(crate) topology: Topology,
    pub(crate) nodes: Vec<Node>,
    pub(crate) disruption: Bernoulli,
}

impl Network {
    /// Create an empty network over a planned topology.
    pub fn new(config: SimulationConfig, topology: Topology) -> Result<Self, ModelError> {
        let disruption = Bernoulli::new(config.protocol.disruption_probability).map_err(|e| {
            ModelError::InvalidConfig(format!("protocol.disruption_probability: {}", e))
        })?;
        Ok(Network {
            config,
            topology,
            nodes: Vec::new(),
            disruption,
        })
    }

    /// Schedule creation of the first node at the current time.
    pub fn start(&self, ctx: &mut SimContext) {
        if !self.topology.is_empty() {
            ctx.post_immediate(EventPayload::CreateNode { index: 0 });
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Nodes created so far, in id order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// A created node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Whether `id` has been created.
    pub fn is_created(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Number of created nodes with a parent.
    pub fn attached_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_attached()).count()
    }

    /// Nodes whose parent is `id`.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.parent == Some(id))
            .map(|n| n.id)
            .collect()
    }

    /// Snapshots of every created node.
    pub fn snapshots(&self) -> Vec<NodeSnapshot> {
        self.nodes.iter().map(Node::snapshot).collect()
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    pub(crate) fn get(&self, id: NodeId) -> Result<&Node, SimError> {
        self.nodes.get(id.index()).ok_or(SimError::UnknownNode(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, SimError> {
        self.nodes.get_mut(id.index()).ok_or(SimError::UnknownNode(id))
    }

    /// Distance between two planned nodes; unknown nodes are infinitely far.
    pub(crate) fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        self.topology.distance(a, b).unwrap_or(f64::INFINITY)
    }

    /// Created nodes other than `from` within link range of it, in id order.
    pub(crate) fn reachable_from(&self, from: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|n| n.id)
            .filter(|&id| id != from && self.topology.in_range(from, id))
            .collect()
    }

    /// Add a symmetric link. Returns false if it already existed.
    pub(crate) fn link(&mut self, a: NodeId, b: NodeId) -> Result<bool, SimError> {
        let added = self.get_mut(a)?.neighbors.insert(b);
        self.get_mut(b)?.neighbors.insert(a);
        Ok(added)
    }

    /// Deliver `message` to `to` after the propagation delay.
    pub(crate) fn send(&self, ctx: &mut SimContext, to: NodeId, message: Message) {
        let delay = self.config.protocol.propagation_delay_time();
        ctx.post_event(delay, EventPayload::Deliver { to, message });
    }

    // ========================================================================
    // Node creation
    // ========================================================================

    fn create_node(&mut self, index: usize, ctx: &mut SimContext) -> Result<(), SimError> {
        let position = match self.topology.positions().get(index) {
            Some(p) if index == self.nodes.len() => *p,
            _ => {
                return Err(SimError::UnexpectedEvent {
                    time: ctx.time(),
                    event: EventPayload::CreateNode { index }.to_string(),
                })
            }
        };

        let id = NodeId::new(index as u32);
        let protocol = &self.config.protocol;
        let (imin, imax) = (protocol.trickle_imin_time(), protocol.trickle_imax_time());
        let rng = ctx.rng();
        let color = [rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()];
        let trickle = Trickle::new(imin, imax, rng);
        let first_fire = trickle.next_fire_delay();

        self.nodes.push(Node::new(id, position, color, ctx.time(), trickle));

        debug!("{}: created at {}", id, position);
        metrics::counter!(metric_defs::NODES_CREATED.name).increment(1);
        ctx.record(
            EventRecord::new(ctx.time(), id, RecordKind::NodeCreated)
                .with_detail("position", position),
        );

        // The four independent activities of a node.
        for kind in [TimerKind::DiscoveryStart, TimerKind::DioInterval] {
            ctx.post_immediate(EventPayload::Timer { node: id, kind });
        }
        for kind in [TimerKind::Trickle, TimerKind::Disruption] {
            ctx.post_event(first_fire, EventPayload::Timer { node: id, kind });
        }

        if index + 1 < self.topology.len() {
            ctx.post_event(
                self.config.node_creation_interval_time(),
                EventPayload::CreateNode { index: index + 1 },
            );
        }
        Ok(())
    }
}

/// Metric labels for a node.
pub(crate) fn labels(node: NodeId) -> Vec<(&'static str, String)> {
    MetricLabels::new(node.to_string()).to_labels()
}

impl EventHandler for Network {
    fn handle_event(&mut self, event: &Event, ctx: &mut SimContext) -> Result<(), SimError> {
        trace!("{} {}", event.time, event.payload);
        match &event.payload {
            EventPayload::CreateNode { index } => self.create_node(*index, ctx),
            EventPayload::Timer { node, kind } => {
                let node = *node;
                self.get(node)?;
                match kind {
                    TimerKind::DiscoveryStart => self.start_discovery(node, ctx),
                    TimerKind::DiscoveryBroadcast => self.discovery_broadcast(node, ctx),
                    TimerKind::DioInterval => self.dio_interval(node, ctx),
                    TimerKind::Trickle => self.trickle_fired(node, ctx),
                    TimerKind::Disruption => self.disruption_check(node, ctx),
                }
            }
            EventPayload::Deliver { to, message } => {
                let to = *to;
                self.get(to)?;
                match message {
                    Message::Dis { sender } => self.receive_dis(to, *sender, ctx),
                    Message::Dio { sender, prefix } => self.receive_dio(to, *sender, prefix, ctx),
                    Message::Dao { child, prefix } => self.receive_dao(to, *child, prefix, ctx),
                }
            }
        }
    }
}
