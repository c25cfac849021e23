//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Shardway - apply versioned schema migrations across a fleet of shards
#[derive(Parser, Debug)]
#[command(name = "sw")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations to every shard
    Migrate(MigrateArgs),

    /// Show what migrate would apply, without applying it
    Plan(PlanArgs),

    /// Show the state of every migration on every shard
    Info(InfoArgs),

    /// Check every shard for drift between ledger and scripts
    Validate(ValidateArgs),

    /// Break a stale shard lock left behind by a crashed run
    Unlock(UnlockArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Shards to migrate (comma-separated, default: all)
    #[arg(short, long)]
    pub shards: Option<String>,

    /// Number of shards migrated concurrently
    #[arg(long)]
    pub threads: Option<usize>,

    /// Apply nothing above this version
    #[arg(long)]
    pub target: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Suppress the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Shards to plan (comma-separated, default: all)
    #[arg(short, long)]
    pub shards: Option<String>,

    /// Plan nothing above this version
    #[arg(long)]
    pub target: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Shards to show (comma-separated, default: all)
    #[arg(short, long)]
    pub shards: Option<String>,

    /// Mark migrations above this version
    #[arg(long)]
    pub target: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Shards to validate (comma-separated, default: all)
    #[arg(short, long)]
    pub shards: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the unlock command
#[derive(Args, Debug)]
pub struct UnlockArgs {
    /// Shard whose lock to break
    pub shard: String,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
