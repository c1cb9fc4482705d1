//! Core token definitions.
//!
//! A token is a position on the 32-bit hash ring. Positions wrap around:
//! the successor of `Token::MAX` is `Token::MIN`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Size of the hash space, i.e. the circumference of the ring.
pub const RING_SIZE: u64 = 1 << 32;

/// Position on the consistent hash ring.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub u32);

impl Token {
    /// Start of the ring.
    pub const MIN: Token = Token(0);
    /// End of the ring.
    pub const MAX: Token = Token(u32::MAX);

    /// Clockwise distance from `self` to `other`.
    ///
    /// The distance from a token to itself is zero; callers that need the
    /// full circle for a lone position must special-case it.
    pub fn distance_to(&self, other: &Self) -> u64 {
        if other.0 >= self.0 {
            u64::from(other.0 - self.0)
        } else {
            RING_SIZE - u64::from(self.0) + u64::from(other.0)
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_forward() {
        assert_eq!(Token(100).distance_to(&Token(250)), 150);
        assert_eq!(Token(7).distance_to(&Token(7)), 0);
    }

    #[test]
    fn test_distance_wraps_around() {
        assert_eq!(Token::MAX.distance_to(&Token::MIN), 1);
        assert_eq!(Token(u32::MAX - 9).distance_to(&Token(10)), 20);
    }
}
