//! Script discovery from a directory.
//!
//! Discovery is a pure function of the directory contents: it never touches
//! the database and is run eagerly when the engine opens.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pgshift_shared::Version;

use super::error::DiscoveryError;
use super::types::{Direction, MigrationScript, MigrationSet};

/// Accepted scheme prefix on a scripts location.
const FILE_SCHEME: &str = "file://";

/// Components parsed from a script file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptName {
    /// Version number.
    pub version: Version,
    /// Description between the version and the direction.
    pub description: String,
    /// Up or down.
    pub direction: Direction,
}

/// Turns a configured location into a filesystem path, dropping a `file://` prefix.
#[must_use]
pub fn normalize_location(location: &str) -> PathBuf {
    PathBuf::from(location.strip_prefix(FILE_SCHEME).unwrap_or(location))
}

/// Parses `{version}_{description}.{up|down}.sql`.
///
/// Returns `Ok(None)` for files that are not `.sql` scripts at all.
///
/// # Errors
///
/// Returns `MalformedName` for a `.sql` file that does not follow the pattern.
pub fn parse_file_name(name: &str) -> Result<Option<ScriptName>, DiscoveryError> {
    let Some(stem) = name.strip_suffix(".sql") else {
        return Ok(None);
    };

    let malformed = |reason: &str| DiscoveryError::MalformedName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let (rest, direction) = if let Some(rest) = stem.strip_suffix(".up") {
        (rest, Direction::Up)
    } else if let Some(rest) = stem.strip_suffix(".down") {
        (rest, Direction::Down)
    } else {
        return Err(malformed("expected a .up.sql or .down.sql suffix"));
    };

    let (version, description) = rest
        .split_once('_')
        .ok_or_else(|| malformed("expected {version}_{description}"))?;

    let version = Version::from_str(version).map_err(|e| malformed(&e.to_string()))?;
    if version.is_zero() {
        return Err(malformed("version must be at least 1"));
    }
    if description.is_empty() {
        return Err(malformed("description is empty"));
    }

    Ok(Some(ScriptName {
        version,
        description: description.to_string(),
        direction,
    }))
}

/// Reads and validates every script under `location`.
///
/// Subdirectories and non-`.sql` files are ignored; an empty directory
/// yields an empty set.
///
/// # Errors
///
/// Returns a `DiscoveryError` if the location cannot be read or the scripts
/// do not form contiguous `up`/`down` pairs.
pub fn discover(location: &Path) -> Result<MigrationSet, DiscoveryError> {
    let unreadable = |source| DiscoveryError::Unreadable {
        path: location.to_path_buf(),
        source,
    };

    let mut scripts = Vec::new();
    for entry in fs::read_dir(location).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(parsed) = parse_file_name(name)? else {
            tracing::debug!(file = %path.display(), "Skipping non-script file");
            continue;
        };

        let sql = fs::read_to_string(&path).map_err(|source| DiscoveryError::UnreadableScript {
            path: path.clone(),
            source,
        })?;
        scripts.push(MigrationScript::new(
            parsed.version,
            parsed.direction,
            parsed.description,
            sql,
        ));
    }

    let set = MigrationSet::from_scripts(scripts)?;
    tracing::debug!(
        location = %location.display(),
        versions = set.len(),
        "Discovered migration scripts"
    );
    Ok(set)
}
