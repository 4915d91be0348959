//! Hierarchical routing prefixes.
//!
//! A root's prefix is `2001:db8::NN` where `NN` is its own id in hex. A node that
//! attaches below a parent appends `:MM` (its own suffix) to the parent's prefix, so
//! the components after `::` spell out the path from the root.
//!
//! Loop detection works on these components: a node that finds its own suffix in an
//! advertised prefix assumes it is already upstream of the advertiser. This is a
//! heuristic. A prefix derived before a later parent switch can still name nodes that
//! are no longer ancestors, which produces conservative rejections.

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address base shared by every prefix.
pub const BASE_PREFIX: &str = "2001:db8::";

/// Routing prefix advertised in DIO and DAO messages.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prefix(String);

impl Prefix {
    /// Base prefix of a node that has no parent.
    pub fn root(node: NodeId) -> Self {
        Prefix(format!("{}{}", BASE_PREFIX, node.suffix()))
    }

    /// Prefix of `node` when attached below a parent advertising `parent`.
    pub fn child_of(parent: &Prefix, node: NodeId) -> Self {
        Prefix(format!("{}:{}", parent.0, node.suffix()))
    }

    /// The textual prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path components after the `::` separator, root first.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        let path = match self.0.split_once("::") {
            Some((_, path)) => path,
            None => self.0.as_str(),
        };
        path.split(':').filter(|c| !c.is_empty())
    }

    /// Whether any component equals the suffix of `node`.
    pub fn contains_suffix(&self, node: NodeId) -> bool {
        self.occurrences(node) > 0
    }

    /// Number of components equal to the suffix of `node`.
    pub fn occurrences(&self, node: NodeId) -> usize {
        let suffix = node.suffix();
        self.components().filter(|c| *c == suffix).count()
    }

    /// Number of hops below the root encoded in this prefix.
    pub fn depth(&self) -> usize {
        self.components().count().saturating_sub(1)
    }

    /// Shortened form used in diagrams (`::00:01` instead of `2001:db8::00:01`).
    pub fn short(&self) -> String {
        match self.0.strip_prefix(BASE_PREFIX) {
            Some(path) => format!("::{}", path),
            None => self.0.clone(),
        }
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix(s.to_string())
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
