//! Node abstractions for the consistent hash ring.
//!
//! Nodes represent backend servers participating in the ring. They are
//! identified by a caller-chosen string `NodeId` (a hostname, an address or
//! any other unique label).

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::token::Token;

/// Identifier for a server on the ring.
///
/// Newtype over `String`; it borrows as `str` so maps keyed by `NodeId` can
/// be queried with plain string slices.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A physical node registered on the ring.
///
/// `weight` is fixed at insertion time: the number of virtual positions is
/// derived from it, so changing it means removing and re-adding the node.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub weight: f64,
    /// Ring positions owned by this node, in virtual-node index order.
    pub virtual_positions: Vec<Token>,
}

impl Node {
    pub(crate) fn new(id: NodeId, weight: f64, virtual_positions: Vec<Token>) -> Self {
        Self {
            id,
            weight,
            virtual_positions,
        }
    }

    /// Number of virtual nodes this node owns.
    pub fn virtual_node_count(&self) -> usize {
        self.virtual_positions.len()
    }
}
