//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! Instead of each physical node having a single position on the ring, each
//! node owns several positions (virtual nodes). This provides:
//!
//! 1. **Better Load Distribution**: more positions give a smoother split of the key space
//! 2. **Weighting**: a node with weight `w` owns `round(base * w)` positions
//! 3. **Gradual Rebalancing**: when a node joins or leaves, only its arcs move
//!
//! # Performance Characteristics
//!
//! - **Memory**: O(v) where v = number of vnodes per node
//! - **Lookup**: O(log n) where n = total vnodes
//! - **Rebalancing**: O(k/N) keys move when a node joins/leaves (k = keys, N = nodes)
//!
//! # Virtual key format
//!
//! Virtual node `i` of node `id` is hashed from the key `"{id}#{i}"`. If that
//! position is already taken, the key is re-derived as `"{id}#{i}#{salt}"`
//! with an increasing salt until a free position is found.

use crate::node::NodeId;
use crate::partitioner::Partitioner;
use crate::token::Token;

/// A virtual node on the hash ring.
///
/// Represents a single position owned by a physical node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualNode {
    /// Position on the ring.
    pub token: Token,
    /// The physical node that owns this virtual node.
    pub node_id: NodeId,
    /// Index of this virtual node among its owner's virtual nodes.
    pub index: usize,
    /// Re-derivation round; 0 unless the unsalted position collided.
    pub salt: u32,
}

impl VirtualNode {
    /// Derive virtual node `index` of `node_id` with the given salt.
    pub fn derive<P: Partitioner + ?Sized>(
        partitioner: &P,
        node_id: &NodeId,
        index: usize,
        salt: u32,
    ) -> Self {
        let key = Self::virtual_key(node_id, index, salt);
        Self {
            token: partitioner.partition(key.as_bytes()),
            node_id: node_id.clone(),
            index,
            salt,
        }
    }

    /// The string that is hashed to place this virtual node.
    pub fn virtual_key(node_id: &NodeId, index: usize, salt: u32) -> String {
        if salt == 0 {
            format!("{node_id}#{index}")
        } else {
            format!("{node_id}#{index}#{salt}")
        }
    }

    #[inline]
    pub fn token(&self) -> Token {
        self.token
    }

    #[inline]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }
}

impl std::fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VNode(token={}, node={}, index={})",
            self.token, self.node_id, self.index
        )
    }
}
