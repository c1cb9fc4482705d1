//! Error types for the core library.

use thiserror::Error;

use crate::node::NodeId;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while changing ring or router membership.
///
/// Routing itself never fails: a key with no usable node resolves to `None`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The node id is already registered.
    #[error("node {0} already exists")]
    AlreadyExists(NodeId),
    /// The node id is not registered.
    #[error("node {0} not found")]
    NotFound(NodeId),
    /// Weight must be a positive, finite number.
    #[error("invalid weight {weight} for node {node}")]
    InvalidWeight { node: NodeId, weight: f64 },
    /// Every salted re-derivation of a virtual node landed on an occupied position.
    #[error("no free ring position for virtual node {index} of {node} after {attempts} attempts")]
    PositionExhausted {
        node: NodeId,
        index: usize,
        attempts: u32,
    },
    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The background sweep task could not be started.
    #[error("scheduler error: {0}")]
    Scheduler(String),
}
