//! Per-server health records.
//!
//! The table is a sharded concurrent map independent of the ring's lock:
//! health updates arrive often and have nothing to do with topology, so they
//! must not block routing reads. A sweep locks one shard at a time.

use std::time::{Duration, Instant};

use corelib::node::NodeId;
use dashmap::DashMap;

/// Liveness as last reported for one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthRecord {
    pub healthy: bool,
    pub last_observed_at: Instant,
}

impl HealthRecord {
    /// Whether the record has gone longer than `stale_after` without an update.
    pub fn is_stale(&self, now: Instant, stale_after: Duration) -> bool {
        now.saturating_duration_since(self.last_observed_at) > stale_after
    }
}

#[derive(Debug, Default)]
pub struct HealthTable {
    records: DashMap<NodeId, HealthRecord>,
}

impl HealthTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a server as healthy, observed at `now`.
    pub fn register(&self, id: NodeId, now: Instant) {
        self.records.insert(
            id,
            HealthRecord {
                healthy: true,
                last_observed_at: now,
            },
        );
    }

    pub fn remove(&self, id: &str) -> Option<HealthRecord> {
        self.records.remove(id).map(|(_, record)| record)
    }

    /// Record an observation; returns the previous flag, or `None` for an unknown id.
    pub fn set(&self, id: &str, healthy: bool, now: Instant) -> Option<bool> {
        let mut record = self.records.get_mut(id)?;
        let previous = record.healthy;
        record.healthy = healthy;
        record.last_observed_at = now;
        Some(previous)
    }

    pub fn get(&self, id: &str) -> Option<HealthRecord> {
        self.records.get(id).map(|r| *r)
    }

    /// Unknown servers are never healthy.
    pub fn is_healthy(&self, id: &str) -> bool {
        self.records.get(id).is_some_and(|r| r.healthy)
    }

    /// Healthy server ids, sorted.
    pub fn healthy_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .records
            .iter()
            .filter(|entry| entry.healthy)
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn healthy_count(&self) -> usize {
        self.records.iter().filter(|entry| entry.healthy).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&self) {
        self.records.clear();
    }

    /// Mark every healthy record older than `stale_after` unhealthy.
    ///
    /// Returns the ids that were flipped. Never marks anything healthy and
    /// leaves `last_observed_at` untouched.
    pub fn sweep(&self, now: Instant, stale_after: Duration) -> Vec<NodeId> {
        let mut flipped = Vec::new();
        for mut entry in self.records.iter_mut() {
            if entry.healthy && entry.is_stale(now, stale_after) {
                entry.healthy = false;
                flipped.push(entry.key().clone());
            }
        }
        flipped.sort();
        flipped
    }
}
