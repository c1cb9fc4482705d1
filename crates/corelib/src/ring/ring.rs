//! Hash ring data structure.
//!
//! The ring keeps two views of the same positions: a map from position to
//! owning node, and a sorted vector of every occupied position that lookups
//! binary-search. Both live behind a single `RwLock`, so membership changes
//! are exclusive while any number of lookups proceed in parallel.

use std::collections::{HashMap, HashSet};
use std::fmt;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::node::{Node, NodeId};
use crate::partitioner::{Murmur3Partitioner, Partitioner};
use crate::ring::stats::{population_std_dev, DistributionStats, NodeShare};
use crate::token::{Token, RING_SIZE};
use crate::vnode::VirtualNode;

/// Virtual nodes per unit of weight when none is configured.
pub const DEFAULT_VIRTUAL_NODES: u32 = 150;

/// Weight given to nodes added without an explicit weight.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Derivations tried per virtual node before giving up on a free position.
pub const MAX_PROBES: u32 = 32;

/// Upper bound on the virtual nodes a single node may own.
pub const MAX_VIRTUAL_NODES: usize = 1 << 16;

#[derive(Debug, Default)]
struct RingState {
    /// Position -> owning node.
    owners: HashMap<Token, NodeId>,
    /// Every key of `owners`, ascending.
    positions: Vec<Token>,
    nodes: HashMap<NodeId, Node>,
}

impl RingState {
    /// Index of the first position at or after `token`, wrapping to 0.
    fn successor(&self, token: Token) -> Option<usize> {
        if self.positions.is_empty() {
            return None;
        }
        let idx = self.positions.partition_point(|p| *p < token);
        Some(if idx == self.positions.len() { 0 } else { idx })
    }

    fn owner_at(&self, idx: usize) -> Option<&NodeId> {
        self.positions.get(idx).and_then(|t| self.owners.get(t))
    }
}

/// Consistent hash ring with weighted virtual nodes.
///
/// Every method takes `&self`; share the ring across threads with `Arc`.
///
/// # Example
///
/// ```rust
/// use corelib::ring::HashRing;
///
/// let ring = HashRing::new();
/// ring.add_node("chat-1", 1.0).unwrap();
/// ring.add_node("chat-2", 2.0).unwrap();
///
/// let owner = ring.get_node("user:42").unwrap();
/// let backups = ring.get_nodes("user:42", 2);
/// assert_eq!(backups[0], owner);
/// ```
pub struct HashRing<P = Murmur3Partitioner> {
    partitioner: P,
    base_virtual_nodes: u32,
    state: RwLock<RingState>,
}

impl HashRing<Murmur3Partitioner> {
    /// Empty ring with the Murmur3 partitioner and the default virtual node count.
    pub fn new() -> Self {
        Self::with_partitioner(Murmur3Partitioner, DEFAULT_VIRTUAL_NODES)
    }

    /// Empty ring placing `base_virtual_nodes` positions per unit of weight.
    pub fn with_virtual_nodes(base_virtual_nodes: u32) -> Self {
        Self::with_partitioner(Murmur3Partitioner, base_virtual_nodes)
    }
}

impl Default for HashRing<Murmur3Partitioner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Partitioner> HashRing<P> {
    /// Empty ring using a custom partitioner.
    ///
    /// A base of zero is raised to one.
    pub fn with_partitioner(partitioner: P, base_virtual_nodes: u32) -> Self {
        Self {
            partitioner,
            base_virtual_nodes: base_virtual_nodes.max(1),
            state: RwLock::new(RingState::default()),
        }
    }

    /// Number of virtual nodes a node of the given weight receives.
    ///
    /// Never zero: a registered node always owns at least one position.
    /// Returns `None` when the count would exceed [`MAX_VIRTUAL_NODES`].
    pub fn virtual_nodes_for(&self, weight: f64) -> Option<usize> {
        let count = (f64::from(self.base_virtual_nodes) * weight).round().max(1.0);
        (count <= MAX_VIRTUAL_NODES as f64).then_some(count as usize)
    }

    /// Add a node with `round(base_virtual_nodes * weight)` virtual nodes.
    ///
    /// Returns the number of positions inserted. Fails without touching the
    /// ring if the id is already present, the weight is not a positive finite
    /// number small enough to stay within [`MAX_VIRTUAL_NODES`], or a free
    /// position could not be found for some virtual node.
    pub fn add_node(&self, id: impl Into<NodeId>, weight: f64) -> Result<usize> {
        let id = id.into();
        let count = match self.virtual_nodes_for(weight) {
            Some(count) if weight.is_finite() && weight > 0.0 => count,
            _ => {
                warn!(node = %id, weight, "rejected node with invalid weight");
                return Err(Error::InvalidWeight { node: id, weight });
            }
        };

        let mut state = self.state.write();
        if state.nodes.contains_key(&id) {
            warn!(node = %id, "node already on the ring");
            return Err(Error::AlreadyExists(id));
        }

        let positions = self.place(&state.owners, &id, count)?;
        for token in &positions {
            state.owners.insert(*token, id.clone());
        }
        state.positions.extend_from_slice(&positions);
        state.positions.sort_unstable();
        state
            .nodes
            .insert(id.clone(), Node::new(id.clone(), weight, positions));

        debug!(
            node = %id,
            weight,
            vnodes = count,
            total_vnodes = state.positions.len(),
            "added node to ring"
        );
        Ok(count)
    }

    /// Pick a free position for each of the node's virtual nodes.
    fn place(
        &self,
        owners: &HashMap<Token, NodeId>,
        id: &NodeId,
        count: usize,
    ) -> Result<Vec<Token>> {
        let mut taken = HashSet::with_capacity(count);
        let mut positions = Vec::with_capacity(count);

        for index in 0..count {
            let vnode = (0..MAX_PROBES)
                .map(|salt| VirtualNode::derive(&self.partitioner, id, index, salt))
                .find(|v| !owners.contains_key(&v.token) && !taken.contains(&v.token))
                .ok_or_else(|| Error::PositionExhausted {
                    node: id.clone(),
                    index,
                    attempts: MAX_PROBES,
                })?;
            if vnode.salt > 0 {
                warn!(node = %id, index, salt = vnode.salt, "ring position collision, re-derived");
            }
            taken.insert(vnode.token);
            positions.push(vnode.token);
        }
        Ok(positions)
    }

    /// Remove a node and all of its virtual positions.
    pub fn remove_node(&self, id: &str) -> Result<Node> {
        let mut state = self.state.write();
        let Some(node) = state.nodes.remove(id) else {
            warn!(node = id, "cannot remove unknown node");
            return Err(Error::NotFound(NodeId::from(id)));
        };

        let removed: HashSet<Token> = node.virtual_positions.iter().copied().collect();
        for token in &node.virtual_positions {
            state.owners.remove(token);
        }
        state.positions.retain(|t| !removed.contains(t));

        debug!(
            node = %node.id,
            vnodes = removed.len(),
            total_vnodes = state.positions.len(),
            "removed node from ring"
        );
        Ok(node)
    }

    /// Node owning `key`, or `None` if the ring is empty.
    pub fn get_node(&self, key: &str) -> Option<NodeId> {
        self.lookup(key.as_bytes())
    }

    /// Byte-key variant of [`get_node`](Self::get_node).
    pub fn lookup(&self, key: &[u8]) -> Option<NodeId> {
        let token = self.partitioner.partition(key);
        let state = self.state.read();
        let idx = state.successor(token)?;
        state.owner_at(idx).cloned()
    }

    /// Up to `count` distinct nodes in clockwise order starting at `key`'s owner.
    ///
    /// The first entry is always [`get_node`](Self::get_node)`(key)`. Fewer than
    /// `count` entries are returned when the ring holds fewer nodes.
    pub fn get_nodes(&self, key: &str, count: usize) -> Vec<NodeId> {
        let token = self.partitioner.partition(key.as_bytes());
        let state = self.state.read();
        let Some(start) = state.successor(token) else {
            return Vec::new();
        };

        let wanted = count.min(state.nodes.len());
        let mut result: Vec<NodeId> = Vec::with_capacity(wanted);
        let len = state.positions.len();
        // Each position is visited at most once, so the walk always terminates.
        for step in 0..len {
            if result.len() >= wanted {
                break;
            }
            if let Some(owner) = state.owner_at((start + step) % len) {
                if !result.contains(owner) {
                    result.push(owner.clone());
                }
            }
        }
        result
    }

    /// Virtual node count, weight and share of the hash space per node.
    pub fn distribution_stats(&self) -> DistributionStats {
        let state = self.state.read();
        let mut owned: HashMap<&NodeId, u64> = HashMap::with_capacity(state.nodes.len());

        let len = state.positions.len();
        for (idx, token) in state.positions.iter().enumerate() {
            let arc = if len == 1 {
                RING_SIZE
            } else {
                state.positions[(idx + len - 1) % len].distance_to(token)
            };
            if let Some(owner) = state.owners.get(token) {
                *owned.entry(owner).or_default() += arc;
            }
        }

        let nodes = state
            .nodes
            .values()
            .map(|node| {
                let arc = owned.get(&node.id).copied().unwrap_or_default();
                let share = NodeShare {
                    virtual_nodes: node.virtual_node_count(),
                    weight: node.weight,
                    ownership: arc as f64 / RING_SIZE as f64,
                };
                (node.id.clone(), share)
            })
            .collect();

        let counts: Vec<f64> = state
            .nodes
            .values()
            .map(|n| n.virtual_node_count() as f64)
            .collect();

        DistributionStats {
            nodes,
            total_virtual_nodes: len,
            std_dev: population_std_dev(&counts),
        }
    }

    /// Population standard deviation of virtual node counts across nodes.
    pub fn standard_deviation(&self) -> f64 {
        let state = self.state.read();
        let counts: Vec<f64> = state
            .nodes
            .values()
            .map(|n| n.virtual_node_count() as f64)
            .collect();
        population_std_dev(&counts)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.read().nodes.contains_key(id)
    }

    /// Snapshot of a registered node.
    pub fn get(&self, id: &str) -> Option<Node> {
        self.state.read().nodes.get(id).cloned()
    }

    /// Registered node ids, sorted.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.state.read().nodes.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// Total number of occupied positions.
    pub fn virtual_node_count(&self) -> usize {
        self.state.read().positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().positions.is_empty()
    }

    /// All positions with their owners, in ring order.
    pub fn tokens(&self) -> Vec<(Token, NodeId)> {
        let state = self.state.read();
        state
            .positions
            .iter()
            .filter_map(|t| state.owners.get(t).map(|id| (*t, id.clone())))
            .collect()
    }

    /// Remove every node.
    pub fn clear(&self) {
        let mut state = self.state.write();
        *state = RingState::default();
        debug!("cleared ring");
    }

    pub fn base_virtual_nodes(&self) -> u32 {
        self.base_virtual_nodes
    }

    pub fn partitioner_name(&self) -> &'static str {
        self.partitioner.name()
    }
}

impl<P: Partitioner> fmt::Debug for HashRing<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("HashRing")
            .field("partitioner", &self.partitioner.name())
            .field("base_virtual_nodes", &self.base_virtual_nodes)
            .field("nodes", &state.nodes.len())
            .field("virtual_nodes", &state.positions.len())
            .finish()
    }
}
