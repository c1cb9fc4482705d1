//! Simple failover strategy.
//!
//! Walks clockwise from the key's position and collects the first `fanout`
//! distinct nodes (primary first). Ring proximity keeps the choice stable:
//! while the primary is down, a key keeps landing on the same backup.
//!
//! # Performance
//!
//! - **Time**: O(log v + w) where v = virtual nodes and w = positions walked
//! - **Space**: O(fanout)

use corelib::node::NodeId;
use corelib::ring::HashRing;

use crate::strategy::FailoverStrategy;

/// Default number of candidates considered, primary included.
pub const DEFAULT_FANOUT: usize = 3;

/// Ring-proximity candidates: the next `fanout` distinct nodes clockwise.
///
/// # Example
///
/// ```rust
/// use corelib::ring::HashRing;
/// use router::strategy::{FailoverStrategy, SimpleStrategy};
///
/// let ring = HashRing::new();
/// ring.add_node("chat-1", 1.0).unwrap();
/// ring.add_node("chat-2", 1.0).unwrap();
///
/// let candidates = SimpleStrategy::new(3).candidates(&ring, "user:42");
/// assert_eq!(candidates.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SimpleStrategy {
    fanout: usize,
}

impl SimpleStrategy {
    pub fn new(fanout: usize) -> Self {
        Self { fanout }
    }

    pub fn fanout(&self) -> usize {
        self.fanout
    }
}

impl Default for SimpleStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_FANOUT)
    }
}

impl FailoverStrategy for SimpleStrategy {
    fn candidates(&self, ring: &HashRing, key: &str) -> Vec<NodeId> {
        ring.get_nodes(key, self.fanout)
    }

    fn name(&self) -> &'static str {
        "SimpleStrategy"
    }
}
