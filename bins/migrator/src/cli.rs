//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};
use pgshift_shared::Version;

/// pgshift - versioned SQL schema migrations for PostgreSQL
#[derive(Parser, Debug)]
#[command(name = "pgshift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply, revert and inspect schema migrations
    Migrate(MigrateArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Database and scripts location
    #[command(flatten)]
    pub target: TargetArgs,

    /// Migration action
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Where to migrate. Unset flags fall back to the configuration files.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// PostgreSQL connection string
    #[arg(long, global = true, env = "PGSHIFT_DB_URL", hide_env_values = true)]
    pub db_url: Option<String>,

    /// Directory holding the migration scripts (`file://` prefix allowed)
    #[arg(long, global = true, env = "PGSHIFT_MIGRATIONS_PATH")]
    pub migrations_path: Option<String>,
}

/// Migration actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum MigrateAction {
    /// Apply every pending migration
    Up,

    /// Revert the most recent migration
    Down,

    /// Show the current version and whether the ledger is dirty
    Status,

    /// Mark the ledger clean at VERSION without running any script
    Force {
        /// Version to record (0 or a discovered version)
        version: Version,
    },

    /// Create an empty up/down script pair for the next version
    Create {
        /// Short description, e.g. "add users table"
        name: String,
    },
}
