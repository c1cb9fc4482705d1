//! Token abstraction module for consistent hashing.
//!
//! Tokens represent positions on the 32-bit hash ring; `murmur3` is the hash
//! that maps keys onto them.

pub mod murmur3;
pub mod traits;

pub use murmur3::{hash, hash_bytes};
pub use traits::{Token, RING_SIZE};
