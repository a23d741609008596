//! Set algebra over id lists.
//!
//! Id lists are persisted as arrays, so these helpers keep first-seen order
//! while guaranteeing that no id appears twice.

use std::collections::HashSet;
use std::hash::Hash;

/// Removes duplicate ids, keeping the first occurrence of each.
#[must_use]
pub fn dedup_ids<T>(ids: &[T]) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

/// Returns the union of `existing` and `additions` without duplicates.
#[must_use]
pub fn union_ids<T>(existing: &[T], additions: &[T]) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let mut seen = HashSet::with_capacity(existing.len() + additions.len());
    existing
        .iter()
        .chain(additions.iter())
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

/// Returns the ids of `existing` that are not listed in `removals`.
#[must_use]
pub fn difference_ids<T>(existing: &[T], removals: &[T]) -> Vec<T>
where
    T: Clone + Eq + Hash,
{
    let removals: HashSet<&T> = removals.iter().collect();
    dedup_ids(existing)
        .into_iter()
        .filter(|id| !removals.contains(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::{dedup_ids, difference_ids, union_ids};

    #[test]
    fn union_keeps_first_seen_order() {
        let merged = union_ids(&["r2", "r1"], &["r1", "r3", "r3"]);
        assert_eq!(merged, vec!["r2", "r1", "r3"]);
    }

    #[test]
    fn difference_may_produce_empty_set() {
        let remaining = difference_ids(&["p1", "p2"], &["p2", "p1", "p9"]);
        assert!(remaining.is_empty());
    }

    #[test]
    fn dedup_removes_repeated_ids() {
        assert_eq!(dedup_ids(&["a", "a", "b", "a"]), vec!["a", "b"]);
    }

    fn as_set(ids: &[u8]) -> BTreeSet<u8> {
        ids.iter().copied().collect()
    }

    proptest! {
        #[test]
        fn repeated_union_is_idempotent(
            base in proptest::collection::vec(0_u8..32, 0..16),
            additions in proptest::collection::vec(0_u8..32, 0..16),
        ) {
            let once = union_ids(&base, &additions);
            let twice = union_ids(&once, &additions);
            prop_assert_eq!(as_set(&once), as_set(&twice));
            prop_assert_eq!(once.len(), as_set(&once).len());
        }

        #[test]
        fn revoke_undoes_grant_of_disjoint_ids(
            base in proptest::collection::btree_set(0_u8..16, 0..8),
            additions in proptest::collection::btree_set(16_u8..32, 0..8),
        ) {
            let base: Vec<u8> = base.into_iter().collect();
            let additions: Vec<u8> = additions.into_iter().collect();
            let granted = union_ids(&base, &additions);
            let revoked = difference_ids(&granted, &additions);
            prop_assert_eq!(as_set(&revoked), as_set(&base));
        }
    }
}
