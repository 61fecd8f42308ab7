//! Command-line interface.

mod report;
mod stats;
mod sync;

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Parser, Subcommand};
use exn::ResultExt;
use logstat_config::Config;
use std::path::PathBuf;

pub use self::report::ReportArgs;
pub use self::stats::StatsArgs;
pub use self::sync::SyncArgs;

#[derive(Debug, Parser)]
#[command(name = "logstat", version, about)]
pub struct Cli {
    /// Configuration file to use instead of the platform default.
    #[arg(long, global = true, env = "LOGSTAT_CONFIG")]
    pub config: Option<PathBuf>,
    /// More logging; repeat for even more.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pull new log archives from the remote store and decompress them.
    Sync(SyncArgs),
    /// Extract statistics from local log files into a spreadsheet.
    Stats(StatsArgs),
    /// Build reports from the analytics index.
    Report(ReportArgs),
}

impl Cli {
    /// Default log filter for the requested verbosity; `RUST_LOG` wins over it.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }

    fn load_config(&self) -> Result<Config> {
        Config::load(self.config.as_deref()).or_raise(|| ErrorKind::Config)
    }

    pub async fn run(self) -> Result<()> {
        match &self.command {
            Command::Stats(args) => stats::run(args).await,
            Command::Sync(args) => sync::run(args, &self.load_config()?).await,
            Command::Report(args) => report::run(args, &self.load_config()?).await,
        }
    }
}
