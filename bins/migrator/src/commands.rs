//! Command implementations.

use anyhow::Context;
use pgshift_core::ledger::{ApplyOutcome, LedgerState, RevertOutcome};
use pgshift_core::script::{discover, normalize_location, plan_next, write_plan};
use pgshift_db::{Engine, EngineOptions};
use pgshift_shared::{AppConfig, Version};

use crate::cli::{Cli, Command, MigrateAction, MigrateArgs};

/// Runs the parsed command line against `config`.
pub async fn run(cli: Cli, config: &AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Migrate(args) => migrate(args, config).await,
    }
}

async fn migrate(args: MigrateArgs, config: &AppConfig) -> anyhow::Result<()> {
    let location = args
        .target
        .migrations_path
        .unwrap_or_else(|| config.migrations.path.clone());

    if let MigrateAction::Create { name } = &args.action {
        return create(&location, name);
    }

    let url = args
        .target
        .db_url
        .unwrap_or_else(|| config.database.url.clone());
    let mut engine = Engine::open(&url, &location, EngineOptions::from_config(config))
        .await
        .context("Failed to open migration engine")?;

    let result = execute(&mut engine, &args.action).await;
    engine.close().await;
    result
}

async fn execute(engine: &mut Engine, action: &MigrateAction) -> anyhow::Result<()> {
    match action {
        MigrateAction::Up => {
            let outcome = engine.apply_all().await.context("Migrate up failed")?;
            println!("{}", render_apply(&outcome));
        }
        MigrateAction::Down => {
            let outcome = engine.revert_one().await.context("Migrate down failed")?;
            println!("{}", render_revert(&outcome));
        }
        MigrateAction::Status => {
            let state = engine
                .current_state()
                .await
                .context("Failed to read migration status")?;
            let pending = engine
                .pending()
                .await
                .context("Failed to count pending migrations")?;
            println!("{}", render_status(state, pending, engine.scripts().latest()));
        }
        MigrateAction::Force { version } => {
            engine
                .force(*version)
                .await
                .with_context(|| format!("Failed to force ledger to version {version}"))?;
            println!("✓ Ledger forced to version {version} (clean)");
        }
        MigrateAction::Create { .. } => anyhow::bail!("create does not use a database connection"),
    }
    Ok(())
}

fn create(location: &str, name: &str) -> anyhow::Result<()> {
    let dir = normalize_location(location);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let set = discover(&dir).context("Failed to read existing migrations")?;
    let plan = plan_next(&set, name).context("Failed to plan new migration")?;
    for path in write_plan(&dir, &plan).context("Failed to write migration scripts")? {
        println!("✓ Created {}", path.display());
    }
    Ok(())
}

fn render_apply(outcome: &ApplyOutcome) -> String {
    match outcome {
        ApplyOutcome::Applied { count, version } => {
            format!("✓ Applied {count} migration(s), current version: {version}")
        }
        ApplyOutcome::NoChange { version } => {
            format!("✓ No pending migrations, current version: {version}")
        }
    }
}

fn render_revert(outcome: &RevertOutcome) -> String {
    match outcome {
        RevertOutcome::Reverted { from, to } => {
            format!("✓ Reverted version {from}, current version: {to}")
        }
        RevertOutcome::NoChange => "✓ Nothing to revert, current version: 0".to_string(),
    }
}

fn render_status(state: LedgerState, pending: usize, latest: Version) -> String {
    let status = if state.dirty { "dirty" } else { "clean" };
    let mut out = format!(
        "Version: {}\nStatus:  {status}\nPending: {pending}\nLatest:  {latest}",
        state.version
    );
    if state.dirty {
        out.push_str(
            "\n\nThe last migration was interrupted. Repair the schema, then run \
             `pgshift migrate force <version>`.",
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u64) -> Version {
        Version::new(n).unwrap()
    }

    #[test]
    fn test_render_apply() {
        assert_eq!(
            render_apply(&ApplyOutcome::Applied {
                count: 3,
                version: v(3)
            }),
            "✓ Applied 3 migration(s), current version: 3"
        );
        assert_eq!(
            render_apply(&ApplyOutcome::NoChange { version: v(2) }),
            "✓ No pending migrations, current version: 2"
        );
    }

    #[test]
    fn test_render_revert() {
        assert_eq!(
            render_revert(&RevertOutcome::Reverted {
                from: v(2),
                to: v(1)
            }),
            "✓ Reverted version 2, current version: 1"
        );
        assert_eq!(
            render_revert(&RevertOutcome::NoChange),
            "✓ Nothing to revert, current version: 0"
        );
    }

    #[test]
    fn test_render_status_clean() {
        assert_eq!(
            render_status(LedgerState::clean(v(2)), 1, v(3)),
            "Version: 2\nStatus:  clean\nPending: 1\nLatest:  3"
        );
    }

    #[test]
    fn test_render_status_dirty() {
        let out = render_status(LedgerState::dirty(v(1)), 2, v(3));
        assert!(out.starts_with("Version: 1\nStatus:  dirty\n"));
        assert!(out.contains("pgshift migrate force"));
    }

    #[test]
    fn test_create_writes_next_pair() {
        let root = tempfile::TempDir::new().unwrap();
        let dir = root.path().join("migrations");
        let location = dir.to_string_lossy().into_owned();

        create(&location, "Add users").unwrap();
        create(&location, "add orders").unwrap();
        let set = discover(&dir).unwrap();
        assert_eq!(set.latest(), v(2));
        assert_eq!(set.get(v(2)).unwrap().up.description(), "add_orders");
    }
}
