//! Command-line front end for the server router.
//!
//! Builds a throwaway router from servers given on the command line and
//! reports, as JSON:
//! - where keys route, with some servers marked down
//! - ring statistics
//! - key spread and movement when a server is removed

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult, ServerSpec};
pub use config::CliConfig;
