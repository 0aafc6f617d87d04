//! Planning ledger transitions.
//!
//! The planner decides which scripts run and what the ledger reads after each
//! one. It refuses to move a dirty ledger and rejects a ledger version the
//! discovered scripts do not know about, before anything touches the database.

use pgshift_shared::Version;

use super::error::PlanError;
use super::state::LedgerState;
use crate::script::{Direction, DiscoveryError, MigrationScript, MigrationSet};

/// One script execution and the ledger transition it performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step<'a> {
    /// Script to execute.
    pub script: &'a MigrationScript,
    /// Ledger version before the script.
    pub from: Version,
    /// Ledger version once the script has committed.
    pub to: Version,
}

impl Step<'_> {
    /// Direction of the underlying script.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.script.direction()
    }

    /// Ledger state once the step has committed.
    #[must_use]
    pub const fn committed(&self) -> LedgerState {
        LedgerState::clean(self.to)
    }
}

fn ensure_movable(state: LedgerState, set: &MigrationSet) -> Result<(), PlanError> {
    if state.dirty {
        return Err(PlanError::Dirty(state.version));
    }
    if !set.knows(state.version) {
        return Err(DiscoveryError::UnknownVersion {
            version: state.version,
            latest: set.latest(),
        }
        .into());
    }
    Ok(())
}

/// Plans every `up` script above the ledger version, in ascending order.
///
/// An empty plan means there is nothing to do.
///
/// # Errors
///
/// Returns `PlanError::Dirty` for a dirty ledger and a discovery error when
/// the ledger version is not among the discovered scripts.
pub fn plan_apply(state: LedgerState, set: &MigrationSet) -> Result<Vec<Step<'_>>, PlanError> {
    ensure_movable(state, set)?;

    let mut from = state.version;
    let steps = set
        .after(state.version)
        .map(|pair| {
            let step = Step {
                script: &pair.up,
                from,
                to: pair.version(),
            };
            from = pair.version();
            step
        })
        .collect();
    Ok(steps)
}

/// Plans the `down` script for the ledger version, or `None` at zero.
///
/// # Errors
///
/// Same refusals as [`plan_apply`].
pub fn plan_revert(state: LedgerState, set: &MigrationSet) -> Result<Option<Step<'_>>, PlanError> {
    ensure_movable(state, set)?;

    let Some(to) = state.version.prev() else {
        return Ok(None);
    };
    let pair = set.get(state.version).ok_or(DiscoveryError::UnknownVersion {
        version: state.version,
        latest: set.latest(),
    })?;

    Ok(Some(Step {
        script: &pair.down,
        from: state.version,
        to,
    }))
}

/// Checks that `version` is a valid target for an administrative overwrite.
///
/// # Errors
///
/// Returns a discovery error unless `version` is zero or discovered.
pub fn check_force(version: Version, set: &MigrationSet) -> Result<(), PlanError> {
    if set.knows(version) {
        Ok(())
    } else {
        Err(DiscoveryError::UnknownVersion {
            version,
            latest: set.latest(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u64) -> Version {
        Version::new(n).unwrap()
    }

    fn set_of(n: u64) -> MigrationSet {
        let scripts = (1..=n).flat_map(|i| {
            [
                MigrationScript::new(v(i), Direction::Up, format!("s{i}"), format!("-- up {i}")),
                MigrationScript::new(v(i), Direction::Down, format!("s{i}"), format!("-- down {i}")),
            ]
        });
        MigrationSet::from_scripts(scripts).unwrap()
    }

    #[test]
    fn test_plan_apply_fresh() {
        let set = set_of(3);
        let steps = plan_apply(LedgerState::default(), &set).unwrap();
        let transitions: Vec<(u64, u64)> = steps.iter().map(|s| (s.from.get(), s.to.get())).collect();
        assert_eq!(transitions, vec![(0, 1), (1, 2), (2, 3)]);
        assert!(steps.iter().all(|s| s.direction() == Direction::Up));
    }

    #[test]
    fn test_plan_apply_partial() {
        let set = set_of(3);
        let steps = plan_apply(LedgerState::clean(v(2)), &set).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].script.sql(), "-- up 3");
    }

    #[test]
    fn test_plan_apply_nothing_pending() {
        let set = set_of(2);
        assert!(plan_apply(LedgerState::clean(v(2)), &set).unwrap().is_empty());
        assert!(plan_apply(LedgerState::default(), &MigrationSet::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_plan_refuses_dirty() {
        let set = set_of(2);
        assert!(matches!(
            plan_apply(LedgerState::dirty(v(1)), &set),
            Err(PlanError::Dirty(version)) if version == v(1)
        ));
        assert!(matches!(
            plan_revert(LedgerState::dirty(v(1)), &set),
            Err(PlanError::Dirty(_))
        ));
    }

    #[test]
    fn test_plan_refuses_unknown_version() {
        let set = set_of(2);
        assert!(matches!(
            plan_apply(LedgerState::clean(v(5)), &set),
            Err(PlanError::Discovery(DiscoveryError::UnknownVersion { .. }))
        ));
        assert!(matches!(
            plan_revert(LedgerState::clean(v(5)), &set),
            Err(PlanError::Discovery(DiscoveryError::UnknownVersion { .. }))
        ));
    }

    #[test]
    fn test_plan_revert() {
        let set = set_of(3);
        let step = plan_revert(LedgerState::clean(v(3)), &set).unwrap().unwrap();
        assert_eq!(step.from, v(3));
        assert_eq!(step.to, v(2));
        assert_eq!(step.script.sql(), "-- down 3");
        assert_eq!(step.committed(), LedgerState::clean(v(2)));
    }

    #[test]
    fn test_plan_revert_at_zero() {
        assert!(plan_revert(LedgerState::default(), &set_of(3)).unwrap().is_none());
        assert!(plan_revert(LedgerState::default(), &MigrationSet::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_check_force() {
        let set = set_of(2);
        assert!(check_force(Version::ZERO, &set).is_ok());
        assert!(check_force(v(2), &set).is_ok());
        assert!(check_force(v(3), &set).is_err());
    }
}
