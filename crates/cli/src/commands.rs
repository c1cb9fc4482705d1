//! Subcommands and the JSON they print.

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Subcommand;
use corelib::ring::{DistributionStats, DEFAULT_WEIGHT};
use corelib::NodeId;
use router::{RouterConfig, RouterStats, ServerRouter};
use serde::Serialize;
use tracing::{debug, info};

/// A server given on the command line as `id` or `id:weight`.
///
/// The weight is taken from the last `:`, so `10.0.0.1:8080:2` is server
/// `10.0.0.1:8080` with weight 2.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSpec {
    pub id: String,
    pub weight: f64,
}

impl FromStr for ServerSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (id, weight) = match s.rsplit_once(':') {
            Some((id, weight)) => {
                let weight = weight
                    .parse::<f64>()
                    .map_err(|_| format!("invalid weight in '{s}'"))?;
                (id, weight)
            }
            None => (s, DEFAULT_WEIGHT),
        };
        if id.is_empty() {
            return Err(format!("empty server id in '{s}'"));
        }
        Ok(Self {
            id: id.to_string(),
            weight,
        })
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Route keys and show where each one lands.
    Route {
        /// Server as `id` or `id:weight`. Repeat for each server.
        #[arg(short, long = "server", required = true)]
        servers: Vec<ServerSpec>,

        /// Mark a server unhealthy before routing. Repeatable.
        #[arg(long)]
        down: Vec<String>,

        /// Keys to route.
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Show ring statistics for a set of servers.
    Stats {
        /// Server as `id` or `id:weight`. Repeat for each server.
        #[arg(short, long = "server", required = true)]
        servers: Vec<ServerSpec>,
    },

    /// Spread synthetic keys over the ring, optionally removing a server.
    Simulate {
        /// Server as `id` or `id:weight`. Repeat for each server.
        #[arg(short, long = "server", required = true)]
        servers: Vec<ServerSpec>,

        /// Number of synthetic keys.
        #[arg(short = 'n', long, default_value = "10000")]
        keys: usize,

        /// Remove this server and report how many keys moved.
        #[arg(long)]
        remove: Option<String>,
    },
}

/// Where one key routes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteOutcome {
    pub key: String,
    pub primary: Option<NodeId>,
    pub route: Option<NodeId>,
    pub candidates: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    #[serde(flatten)]
    pub router: RouterStats,
    pub distribution: DistributionStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerLoad {
    pub keys: usize,
    /// Fraction of the synthetic keys routed here.
    pub share: f64,
    /// Fraction of the hash space owned.
    pub ownership: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemovalReport {
    pub server: NodeId,
    pub moved: usize,
    pub moved_fraction: f64,
    /// Ownership of the removed server before removal.
    pub expected_fraction: f64,
    /// Keys that changed owner without having been on the removed server.
    pub moved_between_survivors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub keys: usize,
    pub servers: BTreeMap<NodeId, ServerLoad>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal: Option<RemovalReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    Routes(Vec<RouteOutcome>),
    Stats(StatsReport),
    Simulation(SimulationReport),
}

impl Command {
    /// Build a router for the given servers and run the command against it.
    pub fn execute(&self, config: &RouterConfig) -> Result<CommandResult> {
        let router = build_router(config, self.servers())?;

        let result = match self {
            Command::Route { down, keys, .. } => {
                for id in down {
                    router
                        .set_server_health(id, false)
                        .with_context(|| format!("cannot mark '{id}' down"))?;
                }
                CommandResult::Routes(keys.iter().map(|key| route_one(&router, key)).collect())
            }
            Command::Stats { .. } => CommandResult::Stats(StatsReport {
                router: router.get_stats(),
                distribution: router.ring().distribution_stats(),
            }),
            Command::Simulate { keys, remove, .. } => {
                CommandResult::Simulation(simulate(&router, *keys, remove.as_deref())?)
            }
        };

        router.destroy();
        Ok(result)
    }

    fn servers(&self) -> &[ServerSpec] {
        match self {
            Command::Route { servers, .. }
            | Command::Stats { servers }
            | Command::Simulate { servers, .. } => servers,
        }
    }
}

fn build_router(config: &RouterConfig, servers: &[ServerSpec]) -> Result<ServerRouter> {
    let router = ServerRouter::new(config.clone())?;
    for server in servers {
        router
            .add_server(server.id.as_str(), server.weight)
            .with_context(|| format!("cannot add server '{}'", server.id))?;
    }
    info!(servers = servers.len(), "ring built");
    Ok(router)
}

fn route_one(router: &ServerRouter, key: &str) -> RouteOutcome {
    let outcome = RouteOutcome {
        key: key.to_string(),
        primary: router.ring().get_node(key),
        route: router.get_route(key),
        candidates: router.route_candidates(key),
    };
    debug!(key, route = ?outcome.route, "routed");
    outcome
}

fn simulate(router: &ServerRouter, count: usize, remove: Option<&str>) -> Result<SimulationReport> {
    let keys: Vec<String> = (0..count).map(|i| format!("key:{i}")).collect();
    let before: Vec<Option<NodeId>> = keys.iter().map(|k| router.ring().get_node(k)).collect();
    let distribution = router.ring().distribution_stats();

    let mut tally: BTreeMap<NodeId, usize> = distribution
        .nodes
        .keys()
        .map(|id| (id.clone(), 0))
        .collect();
    for owner in before.iter().flatten() {
        *tally.entry(owner.clone()).or_default() += 1;
    }

    let servers = tally
        .into_iter()
        .map(|(id, n)| {
            let ownership = distribution.nodes.get(&id).map_or(0.0, |s| s.ownership);
            let load = ServerLoad {
                keys: n,
                share: fraction(n, count),
                ownership,
            };
            (id, load)
        })
        .collect();

    let removal = match remove {
        Some(id) => {
            let expected_fraction = distribution.nodes.get(id).map_or(0.0, |s| s.ownership);
            router
                .remove_server(id)
                .with_context(|| format!("cannot remove server '{id}'"))?;

            let removed = NodeId::from(id);
            let mut moved = 0;
            let mut moved_between_survivors = 0;
            for (key, previous) in keys.iter().zip(&before) {
                if router.ring().get_node(key) != *previous {
                    moved += 1;
                    if previous.as_ref() != Some(&removed) {
                        moved_between_survivors += 1;
                    }
                }
            }
            info!(server = id, moved, "simulated removal");
            Some(RemovalReport {
                server: removed,
                moved,
                moved_fraction: fraction(moved, count),
                expected_fraction,
                moved_between_survivors,
            })
        }
        None => None,
    };

    Ok(SimulationReport {
        keys: count,
        servers,
        removal,
    })
}

fn fraction(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}
