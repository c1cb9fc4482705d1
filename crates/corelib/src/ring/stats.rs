//! Load distribution diagnostics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::node::NodeId;

/// One node's slice of the ring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeShare {
    pub virtual_nodes: usize,
    pub weight: f64,
    /// Fraction of the hash space (0.0..=1.0) whose keys resolve to this node.
    pub ownership: f64,
}

/// Snapshot of how the ring is split between nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistributionStats {
    pub nodes: BTreeMap<NodeId, NodeShare>,
    pub total_virtual_nodes: usize,
    /// Population standard deviation of per-node virtual node counts.
    pub std_dev: f64,
}

/// Population standard deviation; zero for fewer than two samples.
pub(crate) fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
