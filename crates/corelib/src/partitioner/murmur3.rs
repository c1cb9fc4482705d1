//! Murmur3 partitioner implementation.

use crate::partitioner::traits::Partitioner;
use crate::token::Token;

/// Murmur3 partitioner, the default for every ring.
#[derive(Clone, Copy, Debug, Default)]
pub struct Murmur3Partitioner;

impl Partitioner for Murmur3Partitioner {
    fn partition(&self, key: &[u8]) -> Token {
        Token::from_bytes(key)
    }

    fn name(&self) -> &'static str {
        "Murmur3Partitioner"
    }
}
