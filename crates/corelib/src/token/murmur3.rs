//! Murmur3 hash function (x86, 32-bit variant, seed 0).
//!
//! This is the ring's only hash: both virtual-node keys and lookup keys are
//! projected onto the ring with it. The seed is fixed so that positions are
//! identical across processes and restarts.

use crate::token::traits::Token;

/// Hash a string key to a 32-bit value.
pub fn hash(key: &str) -> u32 {
    hash_bytes(key.as_bytes())
}

/// Hash an arbitrary byte string to a 32-bit value.
pub fn hash_bytes(key: &[u8]) -> u32 {
    mur3::murmurhash3_x86_32(&mut &key[..], 0)
}

impl Token {
    /// Creates a token from a byte slice using Murmur3 hashing.
    pub fn from_bytes(data: &[u8]) -> Self {
        Token(hash_bytes(data))
    }

    /// Creates a token from a string key.
    pub fn from_key(key: &str) -> Self {
        Token(hash(key))
    }
}
