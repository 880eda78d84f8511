// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use intentd_cache::Update;

/// The reserved owner denoting device-observed running state. It never
/// deletes and a leaf carried only by it is never reported for deletion.
pub const RUNNING_OWNER: &str = "running";

/// One owner's claim on a leaf value, together with the flags describing how
/// this transaction changed it.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafVariant {
    pub update: Update,
    pub is_new: bool,
    pub is_updated: bool,
    pub delete: bool,
}

impl LeafVariant {
    pub fn new(update: Update, is_new: bool) -> Self {
        Self {
            update,
            is_new,
            is_updated: false,
            delete: false,
        }
    }

    pub fn owner(&self) -> &str {
        self.update.owner()
    }

    pub fn priority(&self) -> i32 {
        self.update.priority()
    }

    /// Flag the variant for deletion; cleared again if the owner re-asserts
    /// the same value later in the insertion phase.
    pub fn mark_delete(&mut self) {
        self.delete = true;
    }

    /// Replace the carried value, flagging the variant as updated.
    pub fn mark_update(&mut self, update: Update) {
        self.update = update;
        self.is_new = false;
        self.is_updated = true;
        self.delete = false;
    }
}

impl std::fmt::Display for LeafVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (new={}, updated={}, delete={})",
            self.update, self.is_new, self.is_updated, self.delete
        )
    }
}

/// The set of variants on one leaf entry, at most one per owner, in
/// insertion order. Ties on priority resolve to the first inserted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafVariants(Vec<LeafVariant>);

impl LeafVariants {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LeafVariant> {
        self.0.iter()
    }

    pub fn get_by_owner(&self, owner: &str) -> Option<&LeafVariant> {
        self.0.iter().find(|variant| variant.owner() == owner)
    }

    pub fn get_by_owner_mut(&mut self, owner: &str) -> Option<&mut LeafVariant> {
        self.0.iter_mut().find(|variant| variant.owner() == owner)
    }

    /// Merge an incoming update for its owner.
    ///
    /// Re-asserting the identical value only clears the delete flag; a
    /// different value from the same owner marks the variant updated; an
    /// unknown owner appends a new variant.
    pub fn add(&mut self, update: &Update, is_new: bool) {
        match self.get_by_owner_mut(update.owner()) {
            Some(variant) if variant.update.equal_skip_path(update) => {
                variant.delete = false;
            }
            Some(variant) => variant.mark_update(update.clone()),
            None => self.0.push(LeafVariant::new(update.clone(), is_new)),
        }
    }

    /// True when no variant justifies keeping the leaf: every variant is
    /// flagged for deletion or belongs to the running owner. A leaf carried
    /// only by running state is kept.
    pub fn should_delete(&self) -> bool {
        if self.0.is_empty() {
            return false;
        }
        if self.0.len() == 1 && self.0[0].owner() == RUNNING_OWNER {
            return false;
        }
        self.0
            .iter()
            .all(|variant| variant.delete || variant.owner() == RUNNING_OWNER)
    }

    /// The lowest priority value among non-deleted variants, `i32::MAX` when
    /// none qualifies.
    pub fn highest_precedence_value(&self) -> i32 {
        self.0
            .iter()
            .filter(|variant| !variant.delete)
            .map(LeafVariant::priority)
            .min()
            .unwrap_or(i32::MAX)
    }

    /// Arbitrate the effective variant for this leaf.
    ///
    /// With `only_changed` unset, the strongest non-deleted variant wins,
    /// falling back to the runner-up when the strongest is flagged for
    /// deletion. With `only_changed` set, the strongest variant is only
    /// reported if this transaction touched it, and the runner-up only when
    /// it becomes effective because the strongest got deleted.
    pub fn get_highest_precedence(&self, only_changed: bool) -> Option<&LeafVariant> {
        if self.0.is_empty() || self.should_delete() {
            return None;
        }

        let mut top: Option<&LeafVariant> = None;
        let mut second: Option<&LeafVariant> = None;
        for variant in &self.0 {
            match top {
                None => top = Some(variant),
                Some(current) if current.priority() > variant.priority() => {
                    second = top;
                    top = Some(variant);
                }
                Some(_) => {
                    if second.is_none_or(|s| s.priority() > variant.priority()) {
                        second = Some(variant);
                    }
                }
            }
        }

        let top = top?;
        if !only_changed {
            return if !top.delete { Some(top) } else { second };
        }

        if !top.delete {
            if top.is_new || top.is_updated {
                return Some(top);
            }
            return None;
        }
        second.filter(|variant| !variant.delete)
    }
}

impl<'a> IntoIterator for &'a LeafVariants {
    type Item = &'a LeafVariant;
    type IntoIter = std::slice::Iter<'a, LeafVariant>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentd_schema::{Path, TypedValue};

    fn update(owner: &str, priority: i32, value: u64) -> Update {
        Update::new(
            Path::from("/interface/eth0/mtu"),
            TypedValue::Uint(value),
            priority,
            owner,
            0,
        )
        .unwrap()
    }

    fn variants(entries: &[(&str, i32, u64, bool)]) -> LeafVariants {
        let mut lv = LeafVariants::default();
        for (owner, priority, value, is_new) in entries {
            lv.add(&update(owner, *priority, *value), *is_new);
        }
        lv
    }

    #[test]
    fn lowest_priority_wins() {
        let lv = variants(&[("a", 10, 1500, false), ("b", 5, 9000, true)]);
        let winner = lv.get_highest_precedence(false).unwrap();
        assert_eq!(winner.owner(), "b");
        assert_eq!(winner.update.value().unwrap(), TypedValue::Uint(9000));
    }

    #[test]
    fn only_changed_skips_untouched_top() {
        let lv = variants(&[("a", 5, 1500, false), ("b", 10, 9000, true)]);
        assert!(lv.get_highest_precedence(true).is_none());
    }

    #[test]
    fn fallback_on_deleted_top() {
        let mut lv = variants(&[("a", 10, 1500, false), ("b", 5, 9000, false)]);
        lv.get_by_owner_mut("b").unwrap().mark_delete();
        let winner = lv.get_highest_precedence(true).unwrap();
        assert_eq!(winner.owner(), "a");
        let winner = lv.get_highest_precedence(false).unwrap();
        assert_eq!(winner.owner(), "a");
    }

    #[test]
    fn all_deleted_reports_none() {
        let mut lv = variants(&[("a", 10, 1500, false), ("b", 5, 9000, false)]);
        lv.get_by_owner_mut("a").unwrap().mark_delete();
        lv.get_by_owner_mut("b").unwrap().mark_delete();
        assert!(lv.should_delete());
        assert!(lv.get_highest_precedence(false).is_none());
        assert!(lv.get_highest_precedence(true).is_none());
    }

    #[test]
    fn running_alone_is_kept() {
        let mut lv = LeafVariants::default();
        lv.add(&update(RUNNING_OWNER, i32::MAX, 1500), false);
        assert!(!lv.should_delete());
    }

    #[test]
    fn running_does_not_block_deletion() {
        let mut lv = variants(&[(RUNNING_OWNER, i32::MAX, 1500, false), ("a", 10, 1500, false)]);
        lv.get_by_owner_mut("a").unwrap().mark_delete();
        assert!(lv.should_delete());
    }

    #[test]
    fn reinsert_same_value_is_idempotent() {
        let mut lv = variants(&[("a", 10, 1500, false)]);
        lv.get_by_owner_mut("a").unwrap().mark_delete();
        lv.add(&update("a", 10, 1500), false);
        let variant = lv.get_by_owner("a").unwrap();
        assert!(!variant.delete);
        assert!(!variant.is_new);
        assert!(!variant.is_updated);
    }

    #[test]
    fn reinsert_new_value_marks_updated() {
        let mut lv = variants(&[("a", 10, 1500, false)]);
        lv.add(&update("a", 10, 9000), true);
        let variant = lv.get_by_owner("a").unwrap();
        assert!(variant.is_updated);
        assert!(!variant.is_new);
        assert!(!variant.delete);
    }

    #[test]
    fn equal_priority_resolves_to_first_inserted() {
        let lv = variants(&[("a", 10, 1500, false), ("b", 10, 9000, false)]);
        assert_eq!(lv.get_highest_precedence(false).unwrap().owner(), "a");
    }

    #[test]
    fn highest_precedence_value_ignores_deleted() {
        let mut lv = variants(&[("a", 10, 1500, false), ("b", 5, 9000, false)]);
        lv.get_by_owner_mut("b").unwrap().mark_delete();
        assert_eq!(lv.highest_precedence_value(), 10);
    }
}
