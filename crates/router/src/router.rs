//! Health-aware routing over the hash ring.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use corelib::node::NodeId;
use corelib::ring::HashRing;
use corelib::{Error, Result};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::RouterConfig;
use crate::health::{HealthRecord, HealthTable};
use crate::strategy::{FailoverStrategy, SimpleStrategy};
use crate::sweep::SweepHandle;

const ROUTES_TOTAL: &str = "ringroute_routes_total";
const STALE_MARKED_TOTAL: &str = "ringroute_stale_marked_total";
const HEALTHY_SERVERS: &str = "ringroute_healthy_servers";

/// Snapshot returned by [`ServerRouter::get_stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterStats {
    pub total_servers: usize,
    pub healthy_servers: usize,
    pub virtual_nodes: usize,
    pub distribution_std_dev: f64,
}

/// Routes keys to healthy servers.
///
/// Owns a [`HashRing`] for placement, a [`HealthTable`] for liveness and a
/// background sweep that marks servers unhealthy once their health has not
/// been refreshed for `stale_after`. Construct one per routing domain and
/// share it with `Arc`; nothing here is global.
///
/// ```rust
/// use router::{RouterConfig, ServerRouter};
///
/// let router = ServerRouter::new(RouterConfig::default()).unwrap();
/// router.add_server("chat-1", 1.0).unwrap();
/// router.add_server("chat-2", 1.0).unwrap();
///
/// let server = router.get_route("user:42").unwrap();
/// router.set_server_health(server.as_str(), false).unwrap();
/// assert_ne!(router.get_route("user:42"), Some(server));
/// router.destroy();
/// ```
pub struct ServerRouter {
    ring: HashRing,
    health: Arc<HealthTable>,
    strategy: Box<dyn FailoverStrategy>,
    clock: Arc<dyn Clock>,
    config: RouterConfig,
    sweeper: Mutex<Option<SweepHandle>>,
    /// Held across ring and health-table changes so both always agree on the
    /// set of registered servers. Routing never takes it.
    membership: Mutex<()>,
}

impl ServerRouter {
    /// Router on the system clock with ring-proximity failover.
    pub fn new(config: RouterConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RouterConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let strategy = SimpleStrategy::new(config.backup_fanout);
        Self::with_strategy(config, clock, Box::new(strategy))
    }

    /// Fully custom router. Starts the staleness sweep.
    pub fn with_strategy(
        config: RouterConfig,
        clock: Arc<dyn Clock>,
        strategy: Box<dyn FailoverStrategy>,
    ) -> Result<Self> {
        config.validate()?;

        let health = Arc::new(HealthTable::new());
        let sweeper = {
            let health = Arc::clone(&health);
            let clock = Arc::clone(&clock);
            let stale_after = config.stale_after();
            SweepHandle::spawn(config.sweep_interval(), move || {
                sweep_table(&health, clock.now(), stale_after);
            })?
        };

        info!(
            virtual_nodes = config.virtual_nodes,
            strategy = strategy.name(),
            sweep_interval_ms = config.sweep_interval_ms,
            stale_after_ms = config.stale_after_ms,
            "server router started"
        );

        Ok(Self {
            ring: HashRing::with_virtual_nodes(config.virtual_nodes),
            health,
            strategy,
            clock,
            config,
            sweeper: Mutex::new(Some(sweeper)),
            membership: Mutex::new(()),
        })
    }

    /// Register a server, healthy as of now.
    pub fn add_server(&self, id: impl Into<NodeId>, weight: f64) -> Result<()> {
        let id = id.into();
        let _membership = self.membership.lock();
        let vnodes = self.ring.add_node(id.clone(), weight)?;
        self.health.register(id.clone(), self.clock.now());
        info!(server = %id, weight, vnodes, "server added");
        self.publish_healthy_count();
        Ok(())
    }

    /// Unregister a server and drop its health record.
    pub fn remove_server(&self, id: &str) -> Result<()> {
        let _membership = self.membership.lock();
        self.ring.remove_node(id)?;
        self.health.remove(id);
        info!(server = id, "server removed");
        self.publish_healthy_count();
        Ok(())
    }

    /// Record an external health observation for a server.
    ///
    /// This is the only way a server becomes healthy again after the sweep
    /// marked it stale.
    pub fn set_server_health(&self, id: &str, healthy: bool) -> Result<()> {
        match self.health.set(id, healthy, self.clock.now()) {
            None => {
                warn!(server = id, healthy, "health update for unknown server");
                return Err(Error::NotFound(NodeId::from(id)));
            }
            Some(previous) if previous != healthy => {
                info!(server = id, healthy, "server health changed");
                self.publish_healthy_count();
            }
            Some(_) => debug!(server = id, healthy, "server health refreshed"),
        }
        Ok(())
    }

    /// Healthy server for `key`, or `None` if no candidate is healthy.
    ///
    /// Returns the primary when it is healthy, otherwise the first healthy
    /// failover candidate.
    pub fn get_route(&self, key: &str) -> Option<NodeId> {
        let Some(primary) = self.ring.get_node(key) else {
            metrics::counter!(ROUTES_TOTAL, "outcome" => "none").increment(1);
            return None;
        };
        if self.health.is_healthy(primary.as_str()) {
            metrics::counter!(ROUTES_TOTAL, "outcome" => "primary").increment(1);
            return Some(primary);
        }

        let route = self
            .strategy
            .candidates(&self.ring, key)
            .into_iter()
            .find(|candidate| self.health.is_healthy(candidate.as_str()));

        match &route {
            Some(backup) => {
                metrics::counter!(ROUTES_TOTAL, "outcome" => "failover").increment(1);
                debug!(key, %primary, %backup, "primary unhealthy, routed to backup");
            }
            None => {
                metrics::counter!(ROUTES_TOTAL, "outcome" => "none").increment(1);
                debug!(key, %primary, "no healthy candidate");
            }
        }
        route
    }

    /// Candidates the router would try for `key`, in order.
    pub fn route_candidates(&self, key: &str) -> Vec<NodeId> {
        self.strategy.candidates(&self.ring, key)
    }

    /// Healthy servers, sorted by id.
    pub fn get_healthy_servers(&self) -> Vec<NodeId> {
        let _membership = self.membership.lock();
        self.health.healthy_ids()
    }

    pub fn get_stats(&self) -> RouterStats {
        let _membership = self.membership.lock();
        RouterStats {
            total_servers: self.ring.node_count(),
            healthy_servers: self.health.healthy_count(),
            virtual_nodes: self.ring.virtual_node_count(),
            distribution_std_dev: self.ring.standard_deviation(),
        }
    }

    pub fn server_health(&self, id: &str) -> Option<HealthRecord> {
        self.health.get(id)
    }

    /// Run one staleness pass now; returns the servers it marked unhealthy.
    pub fn sweep_stale(&self) -> Vec<NodeId> {
        let flipped = sweep_table(&self.health, self.clock.now(), self.config.stale_after());
        if !flipped.is_empty() {
            self.publish_healthy_count();
        }
        flipped
    }

    /// Whether the background sweep is still scheduled.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(SweepHandle::is_running)
    }

    /// Stop the sweep and forget every server.
    ///
    /// The sweep thread has exited by the time this returns. Calling it
    /// again is a no-op. The router stays usable, without a sweep.
    pub fn destroy(&self) {
        if let Some(mut sweeper) = self.sweeper.lock().take() {
            sweeper.stop();
            info!("server router destroyed");
        }
        let _membership = self.membership.lock();
        self.ring.clear();
        self.health.clear();
        self.publish_healthy_count();
    }

    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    fn publish_healthy_count(&self) {
        metrics::gauge!(HEALTHY_SERVERS).set(self.health.healthy_count() as f64);
    }
}

impl fmt::Debug for ServerRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerRouter")
            .field("ring", &self.ring)
            .field("servers", &self.health.len())
            .field("strategy", &self.strategy.name())
            .field("config", &self.config)
            .finish()
    }
}

/// Shared by the background sweep and [`ServerRouter::sweep_stale`].
fn sweep_table(health: &HealthTable, now: Instant, stale_after: Duration) -> Vec<NodeId> {
    let flipped = health.sweep(now, stale_after);
    for id in &flipped {
        warn!(server = %id, ?stale_after, "no health update within threshold, marked unhealthy");
    }
    if !flipped.is_empty() {
        metrics::counter!(STALE_MARKED_TOTAL).increment(flipped.len() as u64);
        metrics::gauge!(HEALTHY_SERVERS).set(health.healthy_count() as f64);
    }
    flipped
}
