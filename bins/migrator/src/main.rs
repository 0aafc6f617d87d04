//! pgshift migration runner.
//!
//! Usage:
//!   pgshift migrate up              - Apply all pending migrations
//!   pgshift migrate down            - Revert the last migration
//!   pgshift migrate status          - Show version and clean/dirty status
//!   pgshift migrate force <version> - Mark the ledger clean at a version
//!   pgshift migrate create <name>   - Scaffold the next up/down pair

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use pgshift_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pgshift=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    commands::run(cli, &config).await
}
