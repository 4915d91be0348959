//! Metric declarations for RPLSim.
//!
//! Protocol counters are declared once as [`Metric`] constants in [`metric_defs`] and
//! incremented through the `metrics` facade. Without an installed recorder every
//! increment is a no-op, so library code can count unconditionally.
//!
//! ```rust,ignore
//! use rplsim_metrics::{metric_defs, MetricLabels};
//!
//! let labels = MetricLabels::new("Node03");
//! metrics::counter!(metric_defs::DIO_SENT.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use rplsim_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const PROBES: Metric = Metric::counter("rplsim.probe.sent")
///     .with_description("Probes sent")
///     .with_unit(Unit::Count)
///     .with_labels(&["node"]);
///
/// assert_eq!(PROBES.name, "rplsim.probe.sent");
/// assert_eq!(PROBES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "rplsim.dio.sent").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit of measurement, if any.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the simulator.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every node-scoped metric.
    pub const NODE_LABELS: &[&str] = &["node"];

    // ========================================================================
    // Discovery
    // ========================================================================

    /// Nodes created by the network.
    pub const NODES_CREATED: Metric = Metric::counter("rplsim.nodes.created")
        .with_description("Nodes created")
        .with_unit(Unit::Count);

    /// DIS messages sent, including trickle re-discovery.
    pub const DIS_SENT: Metric = Metric::counter("rplsim.dis.sent")
        .with_description("DIS messages sent")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// DIS messages received.
    pub const DIS_RECEIVED: Metric = Metric::counter("rplsim.dis.received")
        .with_description("DIS messages received")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    // ========================================================================
    // DODAG Formation
    // ========================================================================

    /// DIO messages sent.
    pub const DIO_SENT: Metric = Metric::counter("rplsim.dio.sent")
        .with_description("DIO messages sent")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// DIO messages received.
    pub const DIO_RECEIVED: Metric = Metric::counter("rplsim.dio.received")
        .with_description("DIO messages received")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// DIOs dropped because the sender's prefix changed in flight.
    pub const DIO_STALE: Metric = Metric::counter("rplsim.dio.stale")
        .with_description("DIO messages dropped as stale")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// DAO messages sent or forwarded.
    pub const DAO_SENT: Metric = Metric::counter("rplsim.dao.sent")
        .with_description("DAO messages sent or forwarded")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// DAO messages absorbed by a parentless node.
    pub const DAO_ABSORBED: Metric = Metric::counter("rplsim.dao.absorbed")
        .with_description("DAO messages absorbed by a root")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// Advertisements dropped by the loop check.
    ///
    /// Labels: node, message (`DIO` or `DAO`)
    pub const CYCLE_REJECTED: Metric = Metric::counter("rplsim.cycle.rejected")
        .with_description("Messages rejected by the loop check")
        .with_unit(Unit::Count)
        .with_labels(&["node", "message"]);

    /// First parent adoptions.
    pub const PARENT_SET: Metric = Metric::counter("rplsim.parent.set")
        .with_description("Parents adopted by unattached nodes")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// Switches to a closer parent.
    pub const PARENT_CHANGES: Metric = Metric::counter("rplsim.parent.changes")
        .with_description("Switches to a closer parent")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// Prefix re-derivations after an upstream change.
    pub const PREFIX_REFRESHED: Metric = Metric::counter("rplsim.prefix.refreshed")
        .with_description("Prefixes re-derived from the current parent")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    // ========================================================================
    // Timers and Disruption
    // ========================================================================

    /// Trickle timer firings.
    pub const TRICKLE_FIRED: Metric = Metric::counter("rplsim.trickle.fired")
        .with_description("Trickle timer firings")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// Trickle interval after each firing.
    pub const TRICKLE_INTERVAL: Metric = Metric::histogram("rplsim.trickle.interval_s")
        .with_description("Trickle interval after each firing in seconds")
        .with_unit(Unit::Seconds)
        .with_labels(NODE_LABELS);

    /// Injected link disruptions.
    pub const DISRUPTIONS: Metric = Metric::counter("rplsim.disruptions")
        .with_description("Injected link disruptions")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// Links severed by disruptions.
    pub const LINKS_SEVERED: Metric = Metric::counter("rplsim.links.severed")
        .with_description("Neighbor links removed by disruptions")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    // ========================================================================
    // Simulation
    // ========================================================================

    /// Events executed by the event loop.
    pub const EVENTS_PROCESSED: Metric = Metric::counter("rplsim.simulation.events")
        .with_description("Events executed by the event loop")
        .with_unit(Unit::Count);

    /// Created nodes that have a parent, sampled at the end of a run.
    pub const ATTACHED_NODES: Metric = Metric::gauge("rplsim.simulation.attached_nodes")
        .with_description("Created nodes with a parent")
        .with_unit(Unit::Count);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &NODES_CREATED,
        &DIS_SENT,
        &DIS_RECEIVED,
        &DIO_SENT,
        &DIO_RECEIVED,
        &DIO_STALE,
        &DAO_SENT,
        &DAO_ABSORBED,
        &CYCLE_REJECTED,
        &PARENT_SET,
        &PARENT_CHANGES,
        &PREFIX_REFRESHED,
        &TRICKLE_FIRED,
        &TRICKLE_INTERVAL,
        &DISRUPTIONS,
        &LINKS_SEVERED,
        &EVENTS_PROCESSED,
        &ATTACHED_NODES,
    ];
}

/// Labels identifying the node a metric belongs to.
///
/// ```rust
/// use rplsim_metrics::MetricLabels;
///
/// let labels = MetricLabels::new("Node07");
/// let extended = labels.with(&[("message", "DIO".to_string())]);
/// assert_eq!(extended.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MetricLabels {
    /// Node display name.
    pub node: String,
}

impl MetricLabels {
    /// Labels for one node.
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("node", self.node.clone())]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Registers every metric description with the installed recorder.
///
/// Call once at startup after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_labels() {
        let labels = MetricLabels::new("Node01");
        assert_eq!(labels.to_labels(), vec![("node", "Node01".to_string())]);

        let extended = labels.with(&[("message", "DAO".to_string())]);
        assert_eq!(extended.len(), 2);
        assert!(extended.contains(&("message", "DAO".to_string())));
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::DIS_SENT.name, "rplsim.dis.sent");
        assert_eq!(metric_defs::DIO_SENT.name, "rplsim.dio.sent");
        assert_eq!(metric_defs::DAO_SENT.name, "rplsim.dao.sent");
        assert_eq!(metric_defs::CYCLE_REJECTED.name, "rplsim.cycle.rejected");
        assert_eq!(metric_defs::CYCLE_REJECTED.labels, &["node", "message"]);
        assert_eq!(metric_defs::PARENT_CHANGES.name, "rplsim.parent.changes");
        assert_eq!(metric_defs::DISRUPTIONS.name, "rplsim.disruptions");
        assert_eq!(metric_defs::TRICKLE_INTERVAL.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::TRICKLE_INTERVAL.unit, Some(Unit::Seconds));
        assert_eq!(metric_defs::ATTACHED_NODES.kind, MetricKind::Gauge);
    }

    #[test]
    fn test_all_metric_names_unique() {
        let mut names: Vec<&str> = metric_defs::ALL.iter().map(|m| m.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());
        assert!(names.iter().all(|n| n.starts_with("rplsim.")));
    }

    #[test]
    fn test_metric_minimal() {
        const MINIMAL: Metric = Metric::gauge("minimal");

        assert_eq!(MINIMAL.name, "minimal");
        assert_eq!(MINIMAL.kind, MetricKind::Gauge);
        assert_eq!(MINIMAL.description, "");
        assert_eq!(MINIMAL.unit, None);
        assert_eq!(MINIMAL.labels, &[] as &[&str]);
    }

    #[test]
    fn test_describe_without_recorder_is_noop() {
        describe_metrics();
    }
}
