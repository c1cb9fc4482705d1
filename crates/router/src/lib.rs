//! Health-aware server routing on a consistent hash ring.
//!
//! This crate answers two questions for a pool of interchangeable servers:
//! which server owns a key, and whether that server is currently usable.
//! - [`ServerRouter`] combines the ring with per-server health records
//! - [`strategy`] decides which servers back up an unhealthy primary
//! - a background sweep retires servers whose health has gone stale
//!
//! Health is pushed in by an external monitor through
//! [`ServerRouter::set_server_health`]; nothing here probes the network.

pub mod clock;
pub mod config;
pub mod health;
pub mod router;
pub mod strategy;
pub mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RouterConfig;
pub use corelib::{Error, NodeId, Result};
pub use health::{HealthRecord, HealthTable};
pub use router::{RouterStats, ServerRouter};
pub use strategy::{FailoverStrategy, SimpleStrategy};
