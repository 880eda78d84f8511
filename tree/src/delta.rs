// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use intentd_cache::{Update, UpdateSlice};
use intentd_schema::{Path, SchemaElem};

use crate::entry::{EntryId, Tree};
use crate::leaf::LeafVariant;

impl Tree {
    /// Collect the effective updates of the whole tree.
    ///
    /// With `only_changed` set, only entries this transaction touched are
    /// returned: the values that have to be pushed southbound. Children are
    /// traversed through the active choice filter, so inactive cases never
    /// contribute.
    pub fn get_highest_precedence(&self, only_changed: bool) -> UpdateSlice {
        let mut result = UpdateSlice::new();
        self.collect_highest_precedence(self.root(), only_changed, &mut result);
        result
    }

    fn collect_highest_precedence(&self, id: EntryId, only_changed: bool, out: &mut UpdateSlice) {
        if let Some(variant) = self
            .node(id)
            .leaf_variants
            .get_highest_precedence(only_changed)
        {
            out.push(variant.update.clone());
        }
        for (_, child) in self.active_children(id) {
            self.collect_highest_precedence(child, only_changed, out);
        }
    }

    /// Calculate the paths to delete southbound.
    ///
    /// Whole keyed-list instances aggregate into a single delete of the
    /// instance path. A choice whose best case changed contributes deletes
    /// for the elements of the previously active case.
    pub fn get_deletes(&self) -> Vec<Path> {
        let mut deletes = Vec::new();
        self.collect_deletes(self.root(), &mut deletes);
        deletes
    }

    fn collect_deletes(&self, id: EntryId, deletes: &mut Vec<Path>) {
        let node = self.node(id);

        // Key value levels carry no schema; on the level just below the key
        // segments of a keyed container, a vanished instance is deleted as a
        // whole instead of leaf by leaf.
        if node.schema.is_none() && node.parent.is_some() {
            if let Some((ancestor, level)) = self.ancestor_schema(id) {
                if let Some(SchemaElem::Container(container)) = self.schema(ancestor) {
                    if !container.keys.is_empty() && level == container.keys.len() {
                        let before = deletes.len();
                        self.delete_vanished_instance(id, &container.keys, deletes);
                        if deletes.len() == before {
                            for &child in self.node(id).children.values() {
                                self.collect_deletes(child, deletes);
                            }
                        }
                        return;
                    }
                }
            }
        }

        if let Some(SchemaElem::Container(_)) = node.schema {
            for (_, resolver) in node.choices.iter() {
                let old_best = resolver.old_best_case();
                let new_best = resolver.best_case();
                if let (Some(old), Some(new)) = (old_best, new_best) {
                    if old != new {
                        let base = self.path(id);
                        for element in resolver.case_elements(old) {
                            deletes.push(base.join(element.clone()));
                        }
                    }
                }
            }
        }

        if node.leaf_variants.should_delete() {
            deletes.push(self.path(id));
            return;
        }

        for &child in node.children.values() {
            self.collect_deletes(child, deletes);
        }
    }

    /// Check whether all key attribute children of a list instance are gone;
    /// if so, one delete for the instance path covers the whole branch.
    fn delete_vanished_instance(&self, id: EntryId, keys: &[String], deletes: &mut Vec<Path>) {
        let mut vanished = true;
        for key in keys {
            if let Some(&child) = self.node(id).children.get(key) {
                if !self.should_delete(child) {
                    vanished = false;
                }
            }
        }
        if vanished {
            deletes.push(self.path(id));
        }
    }

    /// The owner's surviving updates, as persisted to the intended store:
    /// new or updated, not flagged for deletion.
    pub fn get_updates_for_owner(&self, owner: &str) -> UpdateSlice {
        self.leaf_variants_by_owner(owner, |variant| {
            !variant.delete && (variant.is_new || variant.is_updated)
        })
        .into_iter()
        .map(|variant| variant.update.clone())
        .collect()
    }

    /// The owner's dropped paths, as removed from the intended store.
    pub fn get_deletes_for_owner(&self, owner: &str) -> Vec<Path> {
        self.leaf_variants_by_owner(owner, |variant| variant.delete)
            .into_iter()
            .map(|variant| variant.update.path().clone())
            .collect()
    }

    fn leaf_variants_by_owner(
        &self,
        owner: &str,
        filter: impl Fn(&LeafVariant) -> bool,
    ) -> Vec<&LeafVariant> {
        let mut result = Vec::new();
        self.collect_by_owner(self.root(), owner, &filter, &mut result);
        result
    }

    fn collect_by_owner<'a>(
        &'a self,
        id: EntryId,
        owner: &str,
        filter: &impl Fn(&LeafVariant) -> bool,
        out: &mut Vec<&'a LeafVariant>,
    ) {
        if let Some(variant) = self.node(id).leaf_variants.get_by_owner(owner) {
            if filter(variant) {
                out.push(variant);
            }
        }
        for &child in self.node(id).children.values() {
            self.collect_by_owner(child, owner, filter, out);
        }
    }
}
