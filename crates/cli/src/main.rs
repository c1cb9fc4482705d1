//! `ringroute` entry point.

use clap::Parser;
use cli::CliConfig;

fn main() -> anyhow::Result<()> {
    CliConfig::parse().run()
}
