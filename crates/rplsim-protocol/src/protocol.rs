//! Discovery and DIS/DIO/DAO handling.
//!
//! Every handler runs as its own event and touches only the target node (plus the
//! mirror side of a new link). Anything addressed to another node is sent as a
//! message and runs later, in scheduling order.
//!
//! Parent selection:
//! - an unattached node adopts the first acceptable DIO sender;
//! - an attached node switches only to a strictly closer sender that is not its own
//!   child;
//! - a DIO from the current parent re-derives the prefix if the parent's changed.
//!
//! A node whose prefix changes advertises the new prefix to its children, so the
//! `prefix == parent.prefix + suffix` relation is restored one hop at a time.

use crate::network::labels;
use crate::Network;
use rplsim_common::{
    EventPayload, EventRecord, Message, NodeId, Prefix, RecordKind, SimContext, SimError,
    TimerKind,
};
use rplsim_metrics::{metric_defs, MetricLabels};
use tracing::{debug, trace};

impl Network {
    // ========================================================================
    // Discovery
    // ========================================================================

    /// Start neighbor discovery: the DIS fan-out follows after the discovery delay.
    pub(crate) fn start_discovery(
        &mut self,
        node: NodeId,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        ctx.record(EventRecord::new(ctx.time(), node, RecordKind::DiscoveryStarted));
        ctx.post_event(
            self.config.protocol.discovery_delay_time(),
            EventPayload::Timer {
                node,
                kind: TimerKind::DiscoveryBroadcast,
            },
        );
        Ok(())
    }

    pub(crate) fn discovery_broadcast(
        &mut self,
        node: NodeId,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        let sent = self.broadcast_dis(node, ctx)?;
        trace!("{}: discovery solicited {} nodes", node, sent);
        Ok(())
    }

    /// Send a DIS to every created node in range. Returns how many were sent.
    pub(crate) fn broadcast_dis(
        &mut self,
        node: NodeId,
        ctx: &mut SimContext,
    ) -> Result<usize, SimError> {
        let targets = self.reachable_from(node);
        for &to in &targets {
            ctx.record(
                EventRecord::new(ctx.time(), node, RecordKind::DisSent).with_detail("to", to),
            );
            metrics::counter!(metric_defs::DIS_SENT.name, &labels(node)).increment(1);
            self.send(ctx, to, Message::Dis { sender: node });
        }
        Ok(targets.len())
    }

    pub(crate) fn receive_dis(
        &mut self,
        node: NodeId,
        sender: NodeId,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        metrics::counter!(metric_defs::DIS_RECEIVED.name, &labels(node)).increment(1);

        let known = self.get(node)?.neighbors.contains(&sender);
        let reachable = self.is_created(sender) && self.topology.in_range(node, sender);
        let mut record =
            EventRecord::new(ctx.time(), node, RecordKind::DisReceived).with_detail("from", sender);

        if known || !reachable {
            ctx.record(record);
            return Ok(());
        }

        self.link(node, sender)?;
        record = record.with_detail("new_neighbor", sender);
        ctx.record(record);
        trace!("{}: new neighbor {}", node, sender);
        self.send_dio(node, sender, ctx)
    }

    // ========================================================================
    // DIO
    // ========================================================================

    /// One tick of the DIO loop: advertise to every neighbor that is not a child,
    /// then wait for the next tick.
    pub(crate) fn dio_interval(
        &mut self,
        node: NodeId,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        let targets: Vec<NodeId> = self
            .get(node)?
            .neighbors
            .iter()
            .copied()
            .filter(|&n| self.node(n).is_some_and(|nb| nb.parent != Some(node)))
            .collect();
        for to in targets {
            self.send_dio(node, to, ctx)?;
        }
        ctx.post_event(
            self.config.dio_interval_time(),
            EventPayload::Timer {
                node,
                kind: TimerKind::DioInterval,
            },
        );
        Ok(())
    }

    pub(crate) fn send_dio(
        &mut self,
        node: NodeId,
        to: NodeId,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        let prefix = self.get(node)?.prefix.clone();
        ctx.record(
            EventRecord::new(ctx.time(), node, RecordKind::DioSent)
                .with_detail("to", to)
                .with_detail("prefix", &prefix),
        );
        metrics::counter!(metric_defs::DIO_SENT.name, &labels(node)).increment(1);
        self.send(ctx, to, Message::Dio { sender: node, prefix });
        Ok(())
    }

    pub(crate) fn receive_dio(
        &mut self,
        node: NodeId,
        sender: NodeId,
        prefix: &Prefix,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        ctx.record(
            EventRecord::new(ctx.time(), node, RecordKind::DioReceived)
                .with_detail("from", sender)
                .with_detail("prefix", prefix),
        );
        metrics::counter!(metric_defs::DIO_RECEIVED.name, &labels(node)).increment(1);

        // Our own suffix in the advertised path means we are upstream of the sender.
        if prefix.contains_suffix(node) {
            debug!("{}: rejected DIO from {} with cycle, prefix {}", node, sender, prefix);
            ctx.record(
                EventRecord::new(ctx.time(), node, RecordKind::DioRejectedCycle)
                    .with_detail("from", sender)
                    .with_detail("prefix", prefix),
            );
            let labels =
                MetricLabels::new(node.to_string()).with(&[("message", "DIO".to_string())]);
            metrics::counter!(metric_defs::CYCLE_REJECTED.name, &labels).increment(1);
            return Ok(());
        }

        let advertiser = self.get(sender)?;
        if advertiser.prefix != *prefix {
            ctx.record(
                EventRecord::new(ctx.time(), node, RecordKind::DioStale)
                    .with_detail("from", sender)
                    .with_detail("prefix", prefix),
            );
            metrics::counter!(metric_defs::DIO_STALE.name, &labels(node)).increment(1);
            return Ok(());
        }
        let sender_parent = advertiser.parent;

        let me = self.get(node)?;
        let derived = Prefix::child_of(prefix, node);
        match me.parent {
            Some(parent) if parent == sender => {
                if me.prefix == derived {
                    return Ok(());
                }
                self.get_mut(node)?.prefix = derived.clone();
                debug!("{}: prefix refreshed from {} to {}", node, sender, derived);
                ctx.record(
                    EventRecord::new(ctx.time(), node, RecordKind::PrefixRefreshed)
                        .with_detail("parent", sender)
                        .with_detail("prefix", &derived),
                );
                metrics::counter!(metric_defs::PREFIX_REFRESHED.name, &labels(node))
                    .increment(1);
            }
            None => {
                let me = self.get_mut(node)?;
                me.parent = Some(sender);
                me.prefix = derived.clone();
                debug!("{}: adopted parent {}, prefix {}", node, sender, derived);
                ctx.record(
                    EventRecord::new(ctx.time(), node, RecordKind::ParentSet)
                        .with_detail("parent", sender)
                        .with_detail("prefix", &derived),
                );
                metrics::counter!(metric_defs::PARENT_SET.name, &labels(node)).increment(1);
            }
            Some(current) => {
                let closer = self.distance(node, sender) < self.distance(node, current);
                if !closer || sender_parent == Some(node) {
                    return Ok(());
                }
                let me = self.get_mut(node)?;
                me.parent = Some(sender);
                me.prefix = derived.clone();
                debug!(
                    "{}: switched parent {} -> {}, prefix {}",
                    node, current, sender, derived
                );
                ctx.record(
                    EventRecord::new(ctx.time(), node, RecordKind::ParentChanged)
                        .with_detail("from", current)
                        .with_detail("to", sender)
                        .with_detail("prefix", &derived),
                );
                metrics::counter!(metric_defs::PARENT_CHANGES.name, &labels(node))
                    .increment(1);
            }
        }

        self.send_dao(node, ctx)?;
        self.advertise_to_children(node, ctx)
    }

    /// Push the current prefix to every child after a prefix change.
    fn advertise_to_children(&mut self, node: NodeId, ctx: &mut SimContext) -> Result<(), SimError> {
        for child in self.children_of(node) {
            self.send_dio(node, child, ctx)?;
        }
        Ok(())
    }

    // ========================================================================
    // DAO
    // ========================================================================

    /// Register the node's prefix with its parent. Parentless nodes send nothing.
    pub(crate) fn send_dao(&mut self, node: NodeId, ctx: &mut SimContext) -> Result<(), SimError> {
        let me = self.get(node)?;
        let Some(parent) = me.parent else {
            return Ok(());
        };
        let prefix = me.prefix.clone();
        ctx.record(
            EventRecord::new(ctx.time(), node, RecordKind::DaoSent)
                .with_detail("to", parent)
                .with_detail("prefix", &prefix),
        );
        metrics::counter!(metric_defs::DAO_SENT.name, &labels(node)).increment(1);
        self.send(ctx, parent, Message::Dao { child: node, prefix });
        Ok(())
    }

    pub(crate) fn receive_dao(
        &mut self,
        node: NodeId,
        child: NodeId,
        prefix: &Prefix,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        ctx.record(
            EventRecord::new(ctx.time(), node, RecordKind::DaoReceived)
                .with_detail("from", child)
                .with_detail("prefix", prefix),
        );

        // Both hops legitimately appear once in the path being registered.
        if prefix.occurrences(node) > 1 || prefix.occurrences(child) > 1 {
            debug!("{}: rejected DAO from {} with cycle, prefix {}", node, child, prefix);
            ctx.record(
                EventRecord::new(ctx.time(), node, RecordKind::DaoRejectedCycle)
                    .with_detail("from", child)
                    .with_detail("prefix", prefix),
            );
            let labels =
                MetricLabels::new(node.to_string()).with(&[("message", "DAO".to_string())]);
            metrics::counter!(metric_defs::CYCLE_REJECTED.name, &labels).increment(1);
            return Ok(());
        }

        match self.get(node)?.parent {
            Some(parent) => {
                ctx.record(
                    EventRecord::new(ctx.time(), node, RecordKind::DaoForwarded)
                        .with_detail("to", parent)
                        .with_detail("prefix", prefix),
                );
                metrics::counter!(metric_defs::DAO_SENT.name, &labels(node)).increment(1);
                self.send(
                    ctx,
                    parent,
                    Message::Dao {
                        child: node,
                        prefix: prefix.clone(),
                    },
                );
            }
            None => {
                ctx.record(
                    EventRecord::new(ctx.time(), node, RecordKind::DaoAbsorbed)
                        .with_detail("from", child)
                        .with_detail("prefix", prefix),
                );
                metrics::counter!(metric_defs::DAO_ABSORBED.name, &labels(node)).increment(1);
            }
        }
        Ok(())
    }
}
