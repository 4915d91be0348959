//! Checks of the properties every run must preserve.
//!
//! [`check_structure`] covers what holds after every single event: no node is its
//! own parent, links are mirrored, trickle intervals stay within bounds.
//! [`check_prefixes`] verifies `prefix == parent.prefix + suffix`; prefix updates
//! travel as messages, so this only holds once they have all been delivered.

use crate::Network;
use rplsim_common::{NodeId, Prefix, SimTime};
use thiserror::Error;

/// A broken protocol invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{node} is its own parent")]
    SelfParent { node: NodeId },

    #[error("{node} has parent {parent}, which was never created")]
    UnknownParent { node: NodeId, parent: NodeId },

    #[error("{node} lists itself as a neighbor")]
    SelfNeighbor { node: NodeId },

    #[error("link {from} -> {to} is not mirrored")]
    AsymmetricLink { from: NodeId, to: NodeId },

    #[error("{node} trickle interval {interval}s outside [{imin}s, {imax}s]")]
    TrickleOutOfBounds {
        node: NodeId,
        interval: SimTime,
        imin: SimTime,
        imax: SimTime,
    },

    #[error("{node} has prefix {actual}, expected {expected}")]
    PrefixMismatch {
        node: NodeId,
        actual: Prefix,
        expected: Prefix,
    },
}

/// Structural invariants. Returns every violation found.
pub fn check_structure(network: &Network) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for node in network.nodes() {
        if let Some(parent) = node.parent {
            if parent == node.id {
                violations.push(InvariantViolation::SelfParent { node: node.id });
            } else if !network.is_created(parent) {
                violations.push(InvariantViolation::UnknownParent {
                    node: node.id,
                    parent,
                });
            }
        }

        for &neighbor in &node.neighbors {
            if neighbor == node.id {
                violations.push(InvariantViolation::SelfNeighbor { node: node.id });
                continue;
            }
            let mirrored = network
                .node(neighbor)
                .is_some_and(|n| n.neighbors.contains(&node.id));
            if !mirrored {
                violations.push(InvariantViolation::AsymmetricLink {
                    from: node.id,
                    to: neighbor,
                });
            }
        }

        let trickle = &node.trickle;
        if trickle.interval() < trickle.imin() || trickle.interval() > trickle.imax() {
            violations.push(InvariantViolation::TrickleOutOfBounds {
                node: node.id,
                interval: trickle.interval(),
                imin: trickle.imin(),
                imax: trickle.imax(),
            });
        }
    }

    violations
}

/// Prefix consistency of every node against its parent (or its base prefix).
pub fn check_prefixes(network: &Network) -> Vec<InvariantViolation> {
    network
        .nodes()
        .iter()
        .filter_map(|node| {
            let expected = match node.parent {
                Some(parent) => Prefix::child_of(&network.node(parent)?.prefix, node.id),
                None => Prefix::root(node.id),
            };
            (node.prefix != expected).then(|| InvariantViolation::PrefixMismatch {
                node: node.id,
                actual: node.prefix.clone(),
                expected,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn settled_chain() -> Network {
        let mut network = network(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let mut ctx = start(&network);
        ctx.advance_to(secs(5.0), &mut network).unwrap();
        network
    }

    #[test]
    fn test_settled_chain_is_clean() {
        let network = settled_chain();
        assert!(check_structure(&network).is_empty());
        assert!(check_prefixes(&network).is_empty());
    }

    #[test]
    fn test_detects_asymmetric_link_and_self_parent() {
        let mut network = settled_chain();
        network.nodes[0].neighbors.remove(&NodeId(1));
        network.nodes[2].parent = Some(NodeId(2));

        let violations = check_structure(&network);
        assert!(violations.contains(&InvariantViolation::AsymmetricLink {
            from: NodeId(1),
            to: NodeId(0),
        }));
        assert!(violations.contains(&InvariantViolation::SelfParent { node: NodeId(2) }));
    }

    #[test]
    fn test_detects_prefix_mismatch() {
        let mut network = settled_chain();
        network.nodes[1].prefix = Prefix::from("2001:db8::05:01");

        let violations = check_prefixes(&network);
        // Node01 is wrong itself, and Node02 no longer extends it.
        assert_eq!(violations.len(), 2);
        assert!(matches!(
            violations[0],
            InvariantViolation::PrefixMismatch { node: NodeId(1), .. }
        ));
    }
}
