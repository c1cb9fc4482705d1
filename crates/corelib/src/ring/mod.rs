//! Consistent hash ring implementation.
//!
//! The ring manages virtual node positions and provides efficient lookup
//! operations for finding the nodes responsible for keys.

pub mod builder;
pub mod ring;
pub mod stats;

pub use builder::RingBuilder;
pub use ring::{HashRing, DEFAULT_VIRTUAL_NODES, DEFAULT_WEIGHT, MAX_PROBES, MAX_VIRTUAL_NODES};
pub use stats::{DistributionStats, NodeShare};

/// The ring with the default Murmur3 partitioner.
pub type Ring = HashRing;
