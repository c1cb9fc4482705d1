//! Router configuration.

use std::time::Duration;

use corelib::ring::DEFAULT_VIRTUAL_NODES;
use corelib::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::strategy::simple::DEFAULT_FANOUT;

/// Tunables for a [`ServerRouter`](crate::ServerRouter).
///
/// Every field has a default, so a partial JSON document such as
/// `{"backup_fanout": 4}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Virtual nodes per unit of server weight.
    pub virtual_nodes: u32,
    /// Candidates tried for a key, primary included.
    pub backup_fanout: usize,
    /// How often the staleness sweep runs (milliseconds).
    pub sweep_interval_ms: u64,
    /// Age after which an unrefreshed healthy server is marked unhealthy (milliseconds).
    pub stale_after_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            backup_fanout: DEFAULT_FANOUT,
            sweep_interval_ms: 30_000,
            stale_after_ms: 60_000,
        }
    }
}

impl RouterConfig {
    pub fn with_virtual_nodes(mut self, virtual_nodes: u32) -> Self {
        self.virtual_nodes = virtual_nodes;
        self
    }

    pub fn with_backup_fanout(mut self, backup_fanout: usize) -> Self {
        self.backup_fanout = backup_fanout;
        self
    }

    /// Stored in milliseconds; a sub-millisecond remainder rounds up.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = millis_ceil(interval);
        self
    }

    /// Stored in milliseconds; a sub-millisecond remainder rounds up.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after_ms = millis_ceil(stale_after);
        self
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    /// Reject configurations the router cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.virtual_nodes == 0 {
            return Err(Error::InvalidConfig("virtual_nodes must be positive".into()));
        }
        if self.backup_fanout == 0 {
            return Err(Error::InvalidConfig("backup_fanout must be positive".into()));
        }
        if self.sweep_interval_ms == 0 {
            return Err(Error::InvalidConfig("sweep_interval_ms must be positive".into()));
        }
        if self.stale_after_ms == 0 {
            return Err(Error::InvalidConfig("stale_after_ms must be positive".into()));
        }
        Ok(())
    }
}

fn millis_ceil(duration: Duration) -> u64 {
    let mut millis = duration.as_millis();
    if duration.subsec_nanos() % 1_000_000 != 0 {
        millis += 1;
    }
    u64::try_from(millis).unwrap_or(u64::MAX)
}
