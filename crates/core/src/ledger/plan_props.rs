//! Property-based tests for ledger planning.
//!
//! The ledger is simulated by committing each planned step in turn, which is
//! exactly what the engine does on a backend with transactional DDL.

use proptest::prelude::*;
use pgshift_shared::Version;

use super::plan::{plan_apply, plan_revert};
use super::state::LedgerState;
use crate::script::{Direction, MigrationScript, MigrationSet};

fn set_of(n: u64) -> MigrationSet {
    let scripts = (1..=n).flat_map(|i| {
        let v = Version::new(i).unwrap();
        [
            MigrationScript::new(v, Direction::Up, "step", "SELECT 1;"),
            MigrationScript::new(v, Direction::Down, "step", "SELECT 1;"),
        ]
    });
    MigrationSet::from_scripts(scripts).unwrap()
}

fn apply_all(state: LedgerState, set: &MigrationSet) -> (LedgerState, usize) {
    let steps = plan_apply(state, set).unwrap();
    let count = steps.len();
    let end = steps.last().map_or(state, |s| s.committed());
    (end, count)
}

fn revert_one(state: LedgerState, set: &MigrationSet) -> LedgerState {
    plan_revert(state, set)
        .unwrap()
        .map_or(state, |s| s.committed())
}

/// Strategy for a script count and a ledger version within it.
fn set_and_version() -> impl Strategy<Value = (u64, u64)> {
    (0u64..30).prop_flat_map(|n| (Just(n), 0..=n))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Applying twice in a row changes nothing the second time.
    #[test]
    fn prop_apply_is_idempotent((n, current) in set_and_version()) {
        let set = set_of(n);
        let start = LedgerState::clean(Version::new(current).unwrap());

        let (after_first, applied) = apply_all(start, &set);
        prop_assert_eq!(applied as u64, n - current);
        prop_assert_eq!(after_first, LedgerState::clean(set.latest()));

        let (after_second, applied_again) = apply_all(after_first, &set);
        prop_assert_eq!(applied_again, 0);
        prop_assert_eq!(after_second, after_first);
    }

    /// Every planned apply step advances by exactly one version, without gaps.
    #[test]
    fn prop_apply_steps_are_contiguous((n, current) in set_and_version()) {
        let set = set_of(n);
        let steps = plan_apply(LedgerState::clean(Version::new(current).unwrap()), &set).unwrap();

        let mut expected_from = current;
        for step in &steps {
            prop_assert_eq!(step.from.get(), expected_from);
            prop_assert_eq!(step.to.get(), expected_from + 1);
            prop_assert_eq!(step.script.version(), step.to);
            prop_assert_eq!(step.direction(), Direction::Up);
            expected_from += 1;
        }
        prop_assert_eq!(expected_from, n);
    }

    /// Reverting moves back exactly one version, or stays put at zero.
    #[test]
    fn prop_revert_steps_back_one((n, current) in set_and_version()) {
        let set = set_of(n);
        let start = LedgerState::clean(Version::new(current).unwrap());
        let after = revert_one(start, &set);

        if current == 0 {
            prop_assert_eq!(after, start);
        } else {
            prop_assert_eq!(after.version.get(), current - 1);
            prop_assert!(after.is_clean());
        }
    }

    /// Apply, revert, apply lands where the first apply did.
    #[test]
    fn prop_apply_revert_apply_round_trip((n, current) in set_and_version()) {
        let set = set_of(n);
        let start = LedgerState::clean(Version::new(current).unwrap());

        let (first, _) = apply_all(start, &set);
        let reverted = revert_one(first, &set);
        let (second, reapplied) = apply_all(reverted, &set);

        prop_assert_eq!(second, first);
        prop_assert_eq!(reapplied, usize::from(n > 0));
    }

    /// A dirty ledger is never moved by apply or revert.
    #[test]
    fn prop_dirty_ledger_is_frozen((n, current) in set_and_version()) {
        let set = set_of(n);
        let dirty = LedgerState::dirty(Version::new(current).unwrap());
        prop_assert!(plan_apply(dirty, &set).is_err());
        prop_assert!(plan_revert(dirty, &set).is_err());
    }
}
