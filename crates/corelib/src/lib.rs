//! Core library for consistent-hashing server routing.
//!
//! This crate provides the fundamental pieces of the ring:
//! - Murmur3 hashing of keys onto 32-bit tokens
//! - The partitioner seam that places keys and virtual nodes
//! - Node and virtual node abstractions
//! - The weighted hash ring with primary and next-N lookups

pub mod error;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod token;
pub mod vnode;

pub use error::{Error, Result};
pub use node::{Node, NodeId};
pub use partitioner::Partitioner;
pub use ring::{DistributionStats, HashRing, NodeShare, Ring, RingBuilder};
pub use token::Token;
pub use vnode::VirtualNode;
