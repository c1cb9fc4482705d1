//! Partitioner abstraction for consistent hashing.
//!
//! Partitioners are responsible for converting keys into tokens
//! that can be placed on the hash ring.

pub mod murmur3;
pub mod traits;

pub use murmur3::Murmur3Partitioner;
pub use traits::Partitioner;
