//! The persisted version ledger as seen by the planner.

use std::fmt;

use pgshift_shared::Version;

/// `(current_version, dirty)` as stored in the ledger row.
///
/// An absent row reads as `LedgerState::default()`, i.e. clean at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerState {
    /// Version of the last successfully applied script.
    pub version: Version,
    /// Set when the last transition was interrupted.
    pub dirty: bool,
}

impl LedgerState {
    /// A consistent ledger at `version`.
    #[must_use]
    pub const fn clean(version: Version) -> Self {
        Self {
            version,
            dirty: false,
        }
    }

    /// A ledger flagged for manual intervention at `version`.
    #[must_use]
    pub const fn dirty(version: Version) -> Self {
        Self {
            version,
            dirty: true,
        }
    }

    /// True when no manual intervention is pending.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !self.dirty
    }
}

impl fmt::Display for LedgerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.dirty { "dirty" } else { "clean" };
        write!(f, "{} ({status})", self.version)
    }
}

/// Result of applying all pending scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// `count` scripts were applied; the ledger now sits at `version`.
    Applied {
        /// Number of scripts applied.
        count: usize,
        /// Ledger version afterwards.
        version: Version,
    },
    /// Nothing was pending.
    NoChange {
        /// Unchanged ledger version.
        version: Version,
    },
}

impl ApplyOutcome {
    /// Ledger version after the operation.
    #[must_use]
    pub const fn version(&self) -> Version {
        match self {
            Self::Applied { version, .. } | Self::NoChange { version } => *version,
        }
    }
}

/// Result of reverting the latest script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertOutcome {
    /// The `down` script for `from` ran; the ledger now sits at `to`.
    Reverted {
        /// Version before the revert.
        from: Version,
        /// Version after the revert.
        to: Version,
    },
    /// The ledger was already at zero.
    NoChange,
}

impl RevertOutcome {
    /// Ledger version after the operation.
    #[must_use]
    pub const fn version(&self) -> Version {
        match self {
            Self::Reverted { to, .. } => *to,
            Self::NoChange => Version::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_clean_zero() {
        let state = LedgerState::default();
        assert_eq!(state, LedgerState::clean(Version::ZERO));
        assert!(state.is_clean());
    }

    #[test]
    fn test_display() {
        let v = Version::new(4).unwrap();
        assert_eq!(LedgerState::clean(v).to_string(), "4 (clean)");
        assert_eq!(LedgerState::dirty(v).to_string(), "4 (dirty)");
    }

    #[test]
    fn test_outcome_versions() {
        let v = Version::new(2).unwrap();
        assert_eq!(ApplyOutcome::Applied { count: 2, version: v }.version(), v);
        assert_eq!(ApplyOutcome::NoChange { version: v }.version(), v);
        assert_eq!(
            RevertOutcome::Reverted { from: v, to: Version::new(1).unwrap() }
                .version()
                .get(),
            1
        );
        assert_eq!(RevertOutcome::NoChange.version(), Version::ZERO);
    }
}
