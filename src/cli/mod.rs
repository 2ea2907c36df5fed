//! Command-line interface
//!
//! Clap-based CLI surface. The exit code is the contract with the calling
//! git-hook manager: 0 means passed or skipped, nonzero means the commit
//! should be blocked.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod commands;
mod output;

pub use output::Output;

/// Gatehouse - pre-commit quality gates with tool fallback
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable quiet output (minimal)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one hook (or all of them) against changed files
    Run(commands::run::RunArgs),
    /// List the registered hooks and their tool chains
    List,
    /// Show which tools each hook can resolve in this environment
    Status,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let output = Output::new(self.verbose, self.quiet);

        match self.command {
            Commands::Run(args) => commands::run::execute(args, self.config.as_deref(), &output).await,
            Commands::List => commands::list::execute(&output).await,
            Commands::Status => commands::status::execute(self.config.as_deref(), &output).await,
        }
    }
}
