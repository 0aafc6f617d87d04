//! Scaffolding for new script pairs.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use pgshift_shared::Version;

use super::error::ScaffoldError;
use super::types::{Direction, MigrationScript, MigrationSet};

/// The next script pair to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldPlan {
    /// Version allocated to the pair.
    pub version: Version,
    /// Empty `up` script.
    pub up: MigrationScript,
    /// Empty `down` script.
    pub down: MigrationScript,
}

/// Lower-cases `name` and collapses every run of non-alphanumerics into `_`.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Plans the pair that follows the latest version in `set`.
///
/// # Errors
///
/// Returns an error if `name` has no usable characters or no version is left.
pub fn plan_next(set: &MigrationSet, name: &str) -> Result<ScaffoldPlan, ScaffoldError> {
    let description = slugify(name);
    if description.is_empty() {
        return Err(ScaffoldError::EmptyName(name.to_string()));
    }
    let version = set
        .latest()
        .next()
        .ok_or(ScaffoldError::VersionExhausted(set.latest()))?;

    let header = |direction: Direction| {
        format!("-- {description} ({direction})\n-- Version {version}\n\n")
    };

    Ok(ScaffoldPlan {
        version,
        up: MigrationScript::new(version, Direction::Up, &description, header(Direction::Up)),
        down: MigrationScript::new(version, Direction::Down, &description, header(Direction::Down)),
    })
}

/// Writes both halves of `plan` into `location`, refusing to overwrite.
///
/// Either both files are created or neither is left behind.
///
/// # Errors
///
/// Returns `ScaffoldError::Write` if a file exists or cannot be written.
pub fn write_plan(location: &Path, plan: &ScaffoldPlan) -> Result<Vec<PathBuf>, ScaffoldError> {
    let mut written: Vec<PathBuf> = Vec::with_capacity(2);
    for script in [&plan.up, &plan.down] {
        let path = location.join(script.file_name());
        if let Err(err) = write_new(&path, script.sql()) {
            for orphan in &written {
                discard(orphan);
            }
            return Err(err);
        }
        tracing::info!(file = %path.display(), "Created migration script");
        written.push(path);
    }
    Ok(written)
}

fn write_new(path: &Path, contents: &str) -> Result<(), ScaffoldError> {
    let write_err = |source| ScaffoldError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(write_err)?;
    if let Err(source) = file.write_all(contents.as_bytes()) {
        drop(file);
        discard(path);
        return Err(write_err(source));
    }
    Ok(())
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::warn!(file = %path.display(), error = %e, "Cannot remove partial migration script");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::discovery::discover;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("create users", "create_users")]
    #[case("Add-Index!!", "add_index")]
    #[case("  orders__v2 ", "orders_v2")]
    #[case("!!!", "")]
    fn test_slugify(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn test_plan_next_on_empty_set() {
        let plan = plan_next(&MigrationSet::default(), "create users").unwrap();
        assert_eq!(plan.version.get(), 1);
        assert_eq!(plan.up.file_name(), "0001_create_users.up.sql");
        assert_eq!(plan.down.file_name(), "0001_create_users.down.sql");
        assert!(plan.up.is_blank());
    }

    #[test]
    fn test_plan_next_rejects_empty_name() {
        assert!(matches!(
            plan_next(&MigrationSet::default(), "--"),
            Err(ScaffoldError::EmptyName(_))
        ));
    }

    #[test]
    fn test_write_plan_round_trips_through_discovery() {
        let dir = TempDir::new().unwrap();
        let first = plan_next(&MigrationSet::default(), "widgets").unwrap();
        write_plan(dir.path(), &first).unwrap();

        let set = discover(dir.path()).unwrap();
        assert_eq!(set.latest().get(), 1);

        let second = plan_next(&set, "gadgets").unwrap();
        assert_eq!(second.version.get(), 2);
        let written = write_plan(dir.path(), &second).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(discover(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_write_plan_leaves_no_half_pair() {
        let dir = TempDir::new().unwrap();
        let plan = plan_next(&MigrationSet::default(), "widgets").unwrap();
        let down = dir.path().join(plan.down.file_name());
        fs::write(&down, "-- hand written\n").unwrap();

        assert!(matches!(
            write_plan(dir.path(), &plan),
            Err(ScaffoldError::Write { path, .. }) if path == down
        ));
        assert!(!dir.path().join(plan.up.file_name()).exists());
        assert_eq!(fs::read_to_string(&down).unwrap(), "-- hand written\n");
    }

    #[test]
    fn test_write_plan_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let plan = plan_next(&MigrationSet::default(), "widgets").unwrap();
        write_plan(dir.path(), &plan).unwrap();
        assert!(matches!(
            write_plan(dir.path(), &plan),
            Err(ScaffoldError::Write { .. })
        ));
    }
}
