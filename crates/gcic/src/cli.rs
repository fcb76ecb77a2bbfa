//! CLI argument definitions

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gcic")]
#[command(version, about = "GalacticCIC - operations dashboard for the OpenClaw platform")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the collector daemon
    Start,

    /// Stop the collector daemon
    Stop,

    /// Restart the collector daemon
    Restart,

    /// Show collector status and database statistics
    Status,

    /// Launch the TUI dashboard
    Dashboard,

    /// Run one synchronous collection cycle of all tiers
    Collect,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: Option<DbAction>,
    },

    /// Show collector daemon logs
    Logs(LogsArgs),

    /// Install the systemd user service for the collector
    Install,

    /// Show version
    Version,
}

#[derive(Subcommand)]
pub enum DbAction {
    /// Per-table row counts and newest timestamps (default)
    Stats,
    /// Delete rows past retention and expired cache entries
    Prune,
    /// Print the database file path
    Path,
}

#[derive(Args)]
pub struct LogsArgs {
    /// Number of lines to show
    #[arg(short = 'n', long, default_value = "30")]
    pub lines: usize,

    /// Follow log output
    #[arg(short, long)]
    pub follow: bool,
}
