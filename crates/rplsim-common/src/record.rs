//! Event records emitted by the protocol.
//!
//! Every observable protocol step produces an [`EventRecord`]. Records are stored in
//! the order their events ran, which makes the stream a replayable transcript of the
//! run: two runs with the same seed and configuration yield identical streams.
//!
//! Formatting and writing the stream is left to the caller. The [`RecordLog`] can
//! additionally echo selected nodes' records to `tracing` while the run is going.
//!
//! ```rust,ignore
//! use rplsim_common::{RecordFilter, RecordLog};
//!
//! // Echo everything Node01 and Node07 do
//! let log = RecordLog::new(RecordFilter::from_spec("Node01,7"));
//! ```

use crate::{NodeId, SimTime};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Record Types
// ============================================================================

/// Kind of protocol step a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    NodeCreated,
    DiscoveryStarted,
    DisSent,
    DisReceived,
    DioSent,
    DioReceived,
    DioRejectedCycle,
    DioStale,
    ParentSet,
    ParentChanged,
    PrefixRefreshed,
    DaoSent,
    DaoReceived,
    DaoRejectedCycle,
    DaoForwarded,
    DaoAbsorbed,
    TrickleFired,
    DisruptionOccurred,
}

impl RecordKind {
    /// Every kind, in protocol order.
    pub const ALL: [RecordKind; 18] = [
        RecordKind::NodeCreated,
        RecordKind::DiscoveryStarted,
        RecordKind::DisSent,
        RecordKind::DisReceived,
        RecordKind::DioSent,
        RecordKind::DioReceived,
        RecordKind::DioRejectedCycle,
        RecordKind::DioStale,
        RecordKind::ParentSet,
        RecordKind::ParentChanged,
        RecordKind::PrefixRefreshed,
        RecordKind::DaoSent,
        RecordKind::DaoReceived,
        RecordKind::DaoRejectedCycle,
        RecordKind::DaoForwarded,
        RecordKind::DaoAbsorbed,
        RecordKind::TrickleFired,
        RecordKind::DisruptionOccurred,
    ];

    /// Stable name used in the text and JSON streams.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RecordKind::NodeCreated => "node-created",
            RecordKind::DiscoveryStarted => "discovery-started",
            RecordKind::DisSent => "dis-sent",
            RecordKind::DisReceived => "dis-received",
            RecordKind::DioSent => "dio-sent",
            RecordKind::DioReceived => "dio-received",
            RecordKind::DioRejectedCycle => "dio-rejected-cycle",
            RecordKind::DioStale => "dio-stale",
            RecordKind::ParentSet => "parent-set",
            RecordKind::ParentChanged => "parent-changed",
            RecordKind::PrefixRefreshed => "prefix-refreshed",
            RecordKind::DaoSent => "dao-sent",
            RecordKind::DaoReceived => "dao-received",
            RecordKind::DaoRejectedCycle => "dao-rejected-cycle",
            RecordKind::DaoForwarded => "dao-forwarded",
            RecordKind::DaoAbsorbed => "dao-absorbed",
            RecordKind::TrickleFired => "trickle-fired",
            RecordKind::DisruptionOccurred => "disruption-occurred",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    /// Parse a stream name such as `parent-changed`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown record kind: {}", s))
    }
}

/// One entry of the record stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Simulation time of the step.
    pub time: SimTime,
    /// Node that performed the step.
    pub node: NodeId,
    /// What happened.
    pub kind: RecordKind,
    /// Extra key/value pairs, in insertion order.
    pub details: Vec<(&'static str, String)>,
}

impl EventRecord {
    /// Create a record with no details.
    pub fn new(time: SimTime, node: NodeId, kind: RecordKind) -> Self {
        EventRecord {
            time,
            node,
            kind,
            details: Vec::new(),
        }
    }

    /// Add a detail to this record.
    pub fn with_detail(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.details.push((key, value.to_string()));
        self
    }

    /// Look up a detail by key.
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for EventRecord {
    /// `12.30 Node04 parent-set parent=Node01 prefix=2001:db8::00:01:04`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.time, self.node, self.kind)?;
        for (key, value) in &self.details {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

impl Serialize for EventRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3 + self.details.len()))?;
        map.serialize_entry("time", &self.time.as_secs_f64())?;
        map.serialize_entry("node", &self.node)?;
        map.serialize_entry("event", self.kind.as_str())?;
        for (key, value) in &self.details {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

// ============================================================================
// Record Filter
// ============================================================================

/// Selects which nodes' records are echoed live.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Nodes to echo. Empty with `all == false` means echo nothing.
    pub nodes: HashSet<NodeId>,
    /// Echo every node.
    pub all: bool,
    /// Record kinds to echo. Empty means all kinds.
    pub kinds: HashSet<RecordKind>,
}

impl RecordFilter {
    /// A filter that echoes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list of nodes.
    ///
    /// Accepts node names (`Node07`), bare ids (`7`) and `*` for every node. Unparseable
    /// entries are ignored.
    pub fn from_spec(spec: &str) -> Self {
        let mut filter = Self::none();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if part == "*" {
                filter.all = true;
                continue;
            }
            let digits = part.strip_prefix("Node").unwrap_or(part);
            if let Ok(id) = digits.parse::<u32>() {
                filter.nodes.insert(NodeId::new(id));
            }
        }
        filter
    }

    /// Restrict echoing to a record kind (may be called repeatedly).
    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    /// Whether anything is echoed at all.
    pub fn is_enabled(&self) -> bool {
        self.all || !self.nodes.is_empty()
    }

    /// Whether `record` should be echoed.
    pub fn matches(&self, record: &EventRecord) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let node_ok = self.all || self.nodes.contains(&record.node);
        node_ok && (self.kinds.is_empty() || self.kinds.contains(&record.kind))
    }
}

// ============================================================================
// Record Log
// ============================================================================

/// In-order store of every record produced during a run.
#[derive(Debug, Default)]
pub struct RecordLog {
    filter: RecordFilter,
    records: Vec<EventRecord>,
}

impl RecordLog {
    /// Create a log with the given live-echo filter.
    pub fn new(filter: RecordFilter) -> Self {
        RecordLog {
            filter,
            records: Vec::new(),
        }
    }

    /// Append a record, echoing it if the filter selects it.
    pub fn push(&mut self, record: EventRecord) {
        if self.filter.matches(&record) {
            tracing::info!(target: "rplsim::trace", "{}", record);
        } else {
            tracing::trace!("{}", record);
        }
        self.records.push(record);
    }

    /// All records so far.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record was produced.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records of a given kind, in order.
    pub fn of_kind(&self, kind: RecordKind) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    /// Records of a given node, in order.
    pub fn of_node(&self, node: NodeId) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.node == node)
    }

    /// Number of records of a given kind.
    pub fn count(&self, kind: RecordKind) -> usize {
        self.of_kind(kind).count()
    }

    /// The text form of the stream, one record per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.to_string());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(node: u32, kind: RecordKind) -> EventRecord {
        EventRecord::new(SimTime::from_millis(1_250), NodeId::new(node), kind)
    }

    #[test]
    fn test_record_display() {
        let r = record(4, RecordKind::ParentSet)
            .with_detail("parent", NodeId::new(1))
            .with_detail("prefix", "2001:db8::00:01:04");
        assert_eq!(
            r.to_string(),
            "1.25 Node04 parent-set parent=Node01 prefix=2001:db8::00:01:04"
        );
        assert_eq!(r.detail("parent"), Some("Node01"));
        assert_eq!(r.detail("missing"), None);
    }

    #[test]
    fn test_filter_from_spec_empty() {
        let filter = RecordFilter::from_spec("");
        assert!(!filter.is_enabled());
        assert!(!filter.matches(&record(1, RecordKind::DisSent)));
    }

    #[test]
    fn test_filter_from_spec_names_and_ids() {
        let filter = RecordFilter::from_spec("Node01, 7,bogus");
        assert!(filter.is_enabled());
        assert!(filter.matches(&record(1, RecordKind::DisSent)));
        assert!(filter.matches(&record(7, RecordKind::DisSent)));
        assert!(!filter.matches(&record(2, RecordKind::DisSent)));
    }

    #[test]
    fn test_filter_all_with_kind() {
        let filter = RecordFilter::from_spec("*").with_kind(RecordKind::DisruptionOccurred);
        assert!(filter.matches(&record(99, RecordKind::DisruptionOccurred)));
        assert!(!filter.matches(&record(99, RecordKind::DioSent)));
    }

    #[test]
    fn test_kind_names_parse_back() {
        for kind in RecordKind::ALL {
            assert_eq!(kind.as_str().parse::<RecordKind>(), Ok(kind));
        }
        assert_eq!(
            "parent-changed".parse::<RecordKind>(),
            Ok(RecordKind::ParentChanged)
        );
        assert!("parent_changed".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_log_keeps_everything_in_order() {
        let mut log = RecordLog::new(RecordFilter::none());
        log.push(record(0, RecordKind::NodeCreated));
        log.push(record(1, RecordKind::NodeCreated));
        log.push(record(0, RecordKind::DiscoveryStarted));

        assert_eq!(log.len(), 3);
        assert_eq!(log.count(RecordKind::NodeCreated), 2);
        assert_eq!(log.of_node(NodeId::new(0)).count(), 2);
        assert_eq!(
            log.to_text(),
            "1.25 Node00 node-created\n1.25 Node01 node-created\n1.25 Node00 discovery-started\n"
        );
    }
}
