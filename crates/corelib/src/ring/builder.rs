//! Builder for populating a ring in one go.

use crate::error::Result;
use crate::node::NodeId;
use crate::partitioner::{Murmur3Partitioner, Partitioner};
use crate::ring::ring::{HashRing, DEFAULT_VIRTUAL_NODES, DEFAULT_WEIGHT};

/// Fluent construction of a [`HashRing`].
///
/// ```rust
/// use corelib::ring::RingBuilder;
///
/// let ring = RingBuilder::new()
///     .with_virtual_nodes(100)
///     .add_node("chat-1")
///     .add_weighted_node("chat-2", 2.0)
///     .build()
///     .unwrap();
/// assert_eq!(ring.virtual_node_count(), 300);
/// ```
#[derive(Debug)]
pub struct RingBuilder<P = Murmur3Partitioner> {
    partitioner: P,
    virtual_nodes: u32,
    nodes: Vec<(NodeId, f64)>,
}

impl RingBuilder<Murmur3Partitioner> {
    pub fn new() -> Self {
        Self {
            partitioner: Murmur3Partitioner,
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            nodes: Vec::new(),
        }
    }
}

impl Default for RingBuilder<Murmur3Partitioner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Partitioner> RingBuilder<P> {
    /// Swap in a different partitioner.
    pub fn with_partitioner<Q: Partitioner>(self, partitioner: Q) -> RingBuilder<Q> {
        RingBuilder {
            partitioner,
            virtual_nodes: self.virtual_nodes,
            nodes: self.nodes,
        }
    }

    /// Virtual nodes per unit of weight.
    pub fn with_virtual_nodes(mut self, virtual_nodes: u32) -> Self {
        self.virtual_nodes = virtual_nodes;
        self
    }

    pub fn add_node(self, id: impl Into<NodeId>) -> Self {
        self.add_weighted_node(id, DEFAULT_WEIGHT)
    }

    pub fn add_weighted_node(mut self, id: impl Into<NodeId>, weight: f64) -> Self {
        self.nodes.push((id.into(), weight));
        self
    }

    /// Build the ring, failing on the first node the ring rejects.
    pub fn build(self) -> Result<HashRing<P>> {
        let ring = HashRing::with_partitioner(self.partitioner, self.virtual_nodes);
        for (id, weight) in self.nodes {
            ring.add_node(id, weight)?;
        }
        Ok(ring)
    }
}
