//! Migration script types.

use std::fmt;

use pgshift_shared::Version;

use super::error::DiscoveryError;

/// First-line directive that makes a script run outside a transaction.
pub const NO_TRANSACTION_DIRECTIVE: &str = "-- pgshift:no-transaction";

/// Which way a script moves the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Advance the schema by one version.
    Up,
    /// Undo one version.
    Down,
}

impl Direction {
    /// File name suffix component (`up` / `down`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One directional unit of schema change tied to a version.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
    version: Version,
    direction: Direction,
    description: String,
    sql: String,
    transactional: bool,
}

impl MigrationScript {
    /// Creates a script, reading the no-transaction directive from `sql`.
    #[must_use]
    pub fn new(
        version: Version,
        direction: Direction,
        description: impl Into<String>,
        sql: impl Into<String>,
    ) -> Self {
        let sql = sql.into();
        let transactional = !has_no_transaction_directive(&sql);
        Self {
            version,
            direction,
            description: description.into(),
            sql,
            transactional,
        }
    }

    /// Version this script belongs to.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Direction of the script.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Description taken from the file name.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// SQL text to execute.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Whether the script runs inside a transaction together with the ledger update.
    #[must_use]
    pub const fn is_transactional(&self) -> bool {
        self.transactional
    }

    /// True when the SQL contains nothing to execute.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.sql
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with("--"))
    }

    /// Canonical file name, e.g. `0003_add_index.up.sql`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{:04}_{}.{}.sql",
            self.version.get(),
            self.description,
            self.direction
        )
    }
}

fn has_no_transaction_directive(sql: &str) -> bool {
    sql.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.eq_ignore_ascii_case(NO_TRANSACTION_DIRECTIVE))
}

/// The `up` and `down` halves of one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPair {
    /// Script applied when advancing to this version.
    pub up: MigrationScript,
    /// Script applied when reverting from this version.
    pub down: MigrationScript,
}

impl ScriptPair {
    /// Version shared by both halves.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.up.version
    }
}

/// A validated, ordered set of script pairs with versions exactly `1..=n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSet {
    pairs: Vec<ScriptPair>,
}

impl MigrationSet {
    /// Builds a set from loose scripts in any order.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate `(version, direction)` entries, a version
    /// missing one of its halves, or versions that are not contiguous from 1.
    pub fn from_scripts(
        scripts: impl IntoIterator<Item = MigrationScript>,
    ) -> Result<Self, DiscoveryError> {
        let mut ups: Vec<MigrationScript> = Vec::new();
        let mut downs: Vec<MigrationScript> = Vec::new();

        for script in scripts {
            let bucket = match script.direction {
                Direction::Up => &mut ups,
                Direction::Down => &mut downs,
            };
            if bucket.iter().any(|s| s.version == script.version) {
                return Err(DiscoveryError::DuplicateVersion {
                    version: script.version,
                    direction: script.direction,
                });
            }
            bucket.push(script);
        }

        ups.sort_by_key(MigrationScript::version);
        downs.sort_by_key(MigrationScript::version);

        let mut pairs = Vec::with_capacity(ups.len());
        let mut downs = downs.into_iter().peekable();
        for up in ups {
            match downs.peek() {
                Some(down) if down.version == up.version => {}
                Some(down) if down.version < up.version => {
                    return Err(DiscoveryError::MissingPair {
                        version: down.version,
                        missing: Direction::Up,
                    });
                }
                _ => {
                    return Err(DiscoveryError::MissingPair {
                        version: up.version,
                        missing: Direction::Down,
                    });
                }
            }
            if let Some(down) = downs.next() {
                pairs.push(ScriptPair { up, down });
            }
        }
        if let Some(orphan) = downs.next() {
            return Err(DiscoveryError::MissingPair {
                version: orphan.version,
                missing: Direction::Up,
            });
        }

        let mut expected = Version::ZERO;
        for pair in &pairs {
            let next = expected.next().unwrap_or(Version::MAX);
            if pair.version() != next {
                return Err(DiscoveryError::Gap {
                    expected: next,
                    found: pair.version(),
                });
            }
            expected = next;
        }

        Ok(Self { pairs })
    }

    /// Number of versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when no scripts were discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Highest discovered version, `Version::ZERO` for an empty set.
    #[must_use]
    pub fn latest(&self) -> Version {
        self.pairs.last().map_or(Version::ZERO, ScriptPair::version)
    }

    /// Returns the pair for `version`.
    #[must_use]
    pub fn get(&self, version: Version) -> Option<&ScriptPair> {
        // Versions are exactly 1..=n, so the pair for v sits at index v - 1.
        let index = usize::try_from(version.get()).ok()?.checked_sub(1)?;
        self.pairs.get(index)
    }

    /// True if `version` is zero or a discovered version.
    #[must_use]
    pub fn knows(&self, version: Version) -> bool {
        version.is_zero() || self.get(version).is_some()
    }

    /// Pairs with a version strictly greater than `current`, ascending.
    pub fn after(&self, current: Version) -> impl Iterator<Item = &ScriptPair> {
        self.pairs.iter().filter(move |p| p.version() > current)
    }

    /// All pairs, ascending.
    pub fn iter(&self) -> impl Iterator<Item = &ScriptPair> {
        self.pairs.iter()
    }
}
