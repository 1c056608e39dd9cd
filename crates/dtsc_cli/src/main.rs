//! dtsc CLI: incremental declaration bundling from the command line.
//!
//! Provides `dtsc build` for generating declaration files through the cache
//! engine, and `dtsc cache stats` / `dtsc cache clear` for inspecting and
//! resetting the persisted cache.

#![warn(missing_docs)]

mod build;
mod cache;
mod pipeline;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

/// Incremental declaration bundler.
#[derive(Parser, Debug)]
#[command(name = "dtsc", version, about = "Incremental declaration bundler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a project directory or a `dtsc.toml` file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate declaration files for the project's entrypoints.
    Build(BuildArgs),
    /// Inspect or reset the persisted cache.
    Cache {
        /// The cache operation to run.
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Arguments for the `dtsc build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Entrypoints to build, relative to the project root. Replaces `build.entrypoints`.
    pub entries: Vec<PathBuf>,

    /// Output directory, replacing `build.outdir`.
    #[arg(short, long)]
    pub outdir: Option<PathBuf>,

    /// Ignore the cache and regenerate every entrypoint.
    #[arg(long)]
    pub no_cache: bool,
}

/// Operations of the `dtsc cache` subcommand.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Print the cache location, version, and entry count.
    Stats,
    /// Delete the cache file.
    Clear,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a project directory or config file.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    pipeline::init_tracing(&global);

    let result = run(cli.command, &global);

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Runs a command to completion on a fresh tokio runtime.
fn run(command: Command, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match command {
            Command::Build(ref args) => build::run(args, global).await,
            Command::Cache { action } => cache::run(action, global).await,
        }
    })
}
