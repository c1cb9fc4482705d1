//! Command-line arguments and startup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use router::RouterConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, CommandResult};

#[derive(Debug, Parser)]
#[command(
    name = "ringroute",
    version,
    about = "Inspect consistent-hash routing decisions"
)]
pub struct CliConfig {
    /// Path to a JSON router config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug, -vvv trace).
    ///
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Set up logging, run the command and print its result as JSON.
    pub fn run(self) -> Result<()> {
        init_tracing(self.verbose);
        let result = self.execute()?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }

    pub fn execute(&self) -> Result<CommandResult> {
        let config = self.router_config()?;
        self.command.execute(&config)
    }

    /// The config file if one was given, defaults otherwise.
    pub fn router_config(&self) -> Result<RouterConfig> {
        let config = match &self.config {
            Some(path) => load_router_config(path)?,
            None => RouterConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Read a router config from a JSON file. Missing fields take their defaults.
pub fn load_router_config(path: &Path) -> Result<RouterConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: RouterConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    debug!(path = %path.display(), ?config, "loaded router config");
    Ok(config)
}

fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_route_args() {
        let cli = CliConfig::try_parse_from([
            "ringroute", "-vv", "route", "-s", "a", "--server", "b:2", "--down", "a", "k1", "k2",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert!(cli.config.is_none());
        match cli.command {
            Command::Route {
                servers,
                down,
                keys,
            } => {
                assert_eq!(servers.len(), 2);
                assert_eq!(servers[1].weight, 2.0);
                assert_eq!(down, vec!["a"]);
                assert_eq!(keys, vec!["k1", "k2"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_route_requires_servers_and_keys() {
        assert!(CliConfig::try_parse_from(["ringroute", "route", "k1"]).is_err());
        assert!(CliConfig::try_parse_from(["ringroute", "route", "-s", "a"]).is_err());
        assert!(CliConfig::try_parse_from(["ringroute", "stats", "-s", "a:x"]).is_err());
    }

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(9), "trace");
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"virtual_nodes": 40, "backup_fanout": 2}}"#).unwrap();

        let config = load_router_config(file.path()).unwrap();
        assert_eq!(config.virtual_nodes, 40);
        assert_eq!(config.backup_fanout, 2);
        assert_eq!(config.stale_after_ms, RouterConfig::default().stale_after_ms);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"backup_fanout": 0}}"#).unwrap();
        let path = file.path().to_str().unwrap();

        let cli =
            CliConfig::try_parse_from(["ringroute", "--config", path, "stats", "-s", "a"]).unwrap();
        assert!(cli.router_config().is_err());

        let missing = CliConfig::try_parse_from([
            "ringroute",
            "-c",
            "/nonexistent/ringroute.json",
            "stats",
            "-s",
            "a",
        ])
        .unwrap();
        assert!(missing.execute().is_err());
    }
}
