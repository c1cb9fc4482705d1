//! Failover strategy abstractions.
//!
//! A failover strategy decides which nodes may serve a key when its primary
//! is unusable, and in which order they are tried:
//!
//! - **SimpleStrategy**: the next distinct nodes clockwise around the ring

pub mod simple;

pub use simple::SimpleStrategy;

use corelib::node::NodeId;
use corelib::ring::HashRing;

/// Trait for failover strategies.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync) as the router is
/// shared across threads.
pub trait FailoverStrategy: Send + Sync + 'static {
    /// Ordered candidate nodes for `key`, most preferred first.
    ///
    /// The router returns the first healthy entry. The list may include the
    /// primary itself; an unhealthy primary is skipped like any other node.
    fn candidates(&self, ring: &HashRing, key: &str) -> Vec<NodeId>;

    /// Get the strategy name (for logging/debugging).
    fn name(&self) -> &'static str;
}
