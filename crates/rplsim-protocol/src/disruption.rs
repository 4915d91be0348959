//! Random link disruption.
//!
//! Every node runs a disruption check on the same cadence as its trickle timer. When
//! the Bernoulli draw succeeds, all of the node's links are cut (possibly none) and it
//! starts discovery again. Parent and prefix are left as they were, even if the parent
//! was among the severed neighbors.

use crate::network::labels;
use crate::Network;
use rand_distr::Distribution;
use rplsim_common::{EventPayload, EventRecord, NodeId, RecordKind, SimContext, SimError, TimerKind};
use rplsim_metrics::metric_defs;
use std::collections::BTreeSet;
use tracing::debug;

impl Network {
    pub(crate) fn disruption_check(
        &mut self,
        node: NodeId,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        let delay = if self.disruption.sample(ctx.rng()) {
            self.disrupt(node, ctx)?;
            // The loop waits for the discovery it just started.
            self.get(node)?.trickle.next_fire_delay() + self.config.protocol.discovery_delay_time()
        } else {
            self.get(node)?.trickle.next_fire_delay()
        };

        ctx.post_event(
            delay,
            EventPayload::Timer {
                node,
                kind: TimerKind::Disruption,
            },
        );
        Ok(())
    }

    /// Sever every link of `node` and restart its discovery.
    ///
    /// The current neighbors (possibly none) replace `lost_neighbors`, the links are
    /// removed on both sides and the trickle timer is reset.
    pub fn disrupt(&mut self, node: NodeId, ctx: &mut SimContext) -> Result<(), SimError> {
        let lost: BTreeSet<NodeId> = std::mem::take(&mut self.get_mut(node)?.neighbors);
        for &neighbor in &lost {
            self.get_mut(neighbor)?.neighbors.remove(&node);
        }

        debug!("{}: network disruption, {} links severed", node, lost.len());
        ctx.record(
            EventRecord::new(ctx.time(), node, RecordKind::DisruptionOccurred)
                .with_detail("lost", lost.len()),
        );
        metrics::counter!(metric_defs::DISRUPTIONS.name, &labels(node)).increment(1);
        metrics::counter!(metric_defs::LINKS_SEVERED.name, &labels(node))
            .increment(lost.len() as u64);

        let me = self.get_mut(node)?;
        me.lost_neighbors = lost;
        me.trickle.reset(ctx.rng());

        self.start_discovery(node, ctx)
    }
}

#[cfg(test)]
mod tests {
    use crate::invariants::check_structure;
    use crate::test_support::*;
    use rplsim_common::{EventPayload, NodeId, RecordKind, TimerKind};
    use rplsim_model::SimulationConfig;
    use std::collections::BTreeSet;

    const CHAIN: [(f64, f64); 3] = [(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)];

    #[test]
    fn test_disrupt_severs_links_and_rediscovers() {
        let mut network = network(&CHAIN);
        let mut ctx = start(&network);
        ctx.advance_to(secs(5.0), &mut network).unwrap();

        let b = NodeId(1);
        let before = network.node(b).unwrap().neighbors.clone();
        assert_eq!(before, BTreeSet::from([NodeId(0), NodeId(2)]));

        network.disrupt(b, &mut ctx).unwrap();

        let node = network.node(b).unwrap();
        assert_eq!(node.lost_neighbors, before);
        assert!(node.neighbors.is_empty());
        assert_eq!(node.trickle.interval(), secs(1.0));
        // Parent is kept even though the link to it is gone.
        assert_eq!(node.parent, Some(NodeId(0)));
        for other in [NodeId(0), NodeId(2)] {
            assert!(!network.node(other).unwrap().neighbors.contains(&b));
        }
        assert!(check_structure(&network).is_empty());

        let disruption = ctx.records().of_kind(RecordKind::DisruptionOccurred).last().unwrap();
        assert_eq!(disruption.node, b);
        assert_eq!(disruption.detail("lost"), Some("2"));
        let restart = ctx.records().records().last().unwrap();
        assert_eq!((restart.node, restart.kind), (b, RecordKind::DiscoveryStarted));

        // The DIS fan-out after the discovery delay restores both links.
        ctx.advance_to(secs(5.1), &mut network).unwrap();
        assert_eq!(network.node(b).unwrap().neighbors, before);
        assert!(check_structure(&network).is_empty());
    }

    #[test]
    fn test_disrupt_isolated_node_restarts_discovery() {
        let mut network = network(&[(0.0, 0.0), (100.0, 0.0)]);
        let mut ctx = start(&network);
        ctx.advance_to(secs(3.0), &mut network).unwrap();

        let a = NodeId(0);
        // Left over from an earlier disruption.
        network.nodes[0].lost_neighbors.insert(NodeId(1));
        let restarts = ctx.records().count(RecordKind::DiscoveryStarted);

        network.disrupt(a, &mut ctx).unwrap();

        let disruption = ctx.records().of_kind(RecordKind::DisruptionOccurred).last().unwrap();
        assert_eq!(disruption.node, a);
        assert_eq!(disruption.detail("lost"), Some("0"));
        assert!(network.node(a).unwrap().lost_neighbors.is_empty());
        assert_eq!(network.node(a).unwrap().trickle.interval(), secs(1.0));
        assert_eq!(ctx.records().count(RecordKind::DiscoveryStarted), restarts + 1);
        assert!(check_structure(&network).is_empty());
    }

    #[test]
    fn test_certain_disruption_hits_lone_node() {
        let mut config = SimulationConfig {
            node_count: 1,
            ..Default::default()
        };
        config.protocol.disruption_probability = 1.0;
        let mut network = network_with(config, &[(0.0, 0.0)]);
        let mut ctx = start(&network);
        ctx.advance_to(secs(30.0), &mut network).unwrap();

        // Checks fire every 1.1 to 10.1 seconds, and every one of them disrupts.
        let disruptions = ctx.records().count(RecordKind::DisruptionOccurred);
        assert!(disruptions >= 3, "only {} disruptions", disruptions);
        assert_eq!(
            ctx.records().count(RecordKind::DiscoveryStarted),
            1 + disruptions
        );
        assert!(network.node(NodeId(0)).unwrap().lost_neighbors.is_empty());
    }

    #[test]
    fn test_certain_disruption_keeps_structure() {
        let mut config = SimulationConfig {
            node_count: CHAIN.len(),
            ..Default::default()
        };
        config.protocol.disruption_probability = 1.0;
        let mut network = network_with(config, &CHAIN);
        let mut ctx = start(&network);

        let mut horizon = secs(0.0);
        while horizon < secs(30.0) {
            horizon = horizon + secs(0.25);
            ctx.advance_to(horizon, &mut network).unwrap();
            assert_eq!(check_structure(&network), Vec::new());
        }

        assert!(ctx.records().count(RecordKind::DisruptionOccurred) > 0);
        assert!(ctx
            .records()
            .of_kind(RecordKind::DisruptionOccurred)
            .any(|r| r.detail("lost") != Some("0")));
        // Each disruption restarts discovery.
        let restarts = ctx.records().count(RecordKind::DiscoveryStarted);
        assert_eq!(
            restarts,
            CHAIN.len() + ctx.records().count(RecordKind::DisruptionOccurred)
        );
    }

    #[test]
    fn test_check_reschedules_itself() {
        let mut network = network(&[(0.0, 0.0)]);
        let mut ctx = start(&network);
        ctx.advance_to(secs(0.0), &mut network).unwrap();

        let pending = ctx.scheduler().len();
        ctx.post_immediate(EventPayload::Timer {
            node: NodeId(0),
            kind: TimerKind::Disruption,
        });
        ctx.advance_to(secs(0.0), &mut network).unwrap();
        // The injected check ran and queued its own successor.
        assert_eq!(ctx.scheduler().len(), pending + 1);
    }
}
