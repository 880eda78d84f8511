// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use std::collections::{BTreeMap, BTreeSet};

use intentd_cache::{CacheClientBound, CacheError, Store, Update, UpdateSlice};
use intentd_schema::{Path, SchemaCache, SchemaElem, SchemaError};

/// Per-transaction surroundings of a [`crate::Tree`].
///
/// Carries the active intent owner, the bound schema and cache clients, and
/// the intended-store key index: every stored path with its (owner, priority)
/// metadata but no values. The index answers existence and precedence
/// queries without further cache round trips.
pub struct TreeContext {
    owner: String,
    schema: SchemaCache,
    cache: CacheClientBound,
    index: BTreeMap<Vec<String>, UpdateSlice>,
}

impl TreeContext {
    pub fn new(owner: impl Into<String>, schema: SchemaCache, cache: CacheClientBound) -> Self {
        Self {
            owner: owner.into(),
            schema,
            cache,
            index: BTreeMap::new(),
        }
    }

    /// The owner of the intent this transaction processes.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn cache(&self) -> &CacheClientBound {
        &self.cache
    }

    /// Populate the key index from the intended store.
    pub fn load_store_index(&mut self) -> Result<(), CacheError> {
        let keys = self.cache.get_keys(Store::Intended)?;
        self.index.clear();
        for update in keys {
            self.index
                .entry(update.path().segments().to_vec())
                .or_default()
                .push(update);
        }
        Ok(())
    }

    /// All indexed paths stored under the given owner.
    pub fn paths_for_owner(&self, owner: &str) -> Vec<Path> {
        self.index
            .iter()
            .filter(|(_, updates)| updates.iter().any(|update| update.owner() == owner))
            .map(|(segments, _)| Path::from(segments.clone()))
            .collect()
    }

    /// True if any indexed path equals the given path or extends it.
    pub fn path_exists(&self, path: &Path) -> bool {
        let prefix = path.segments();
        self.index
            .range(prefix.to_vec()..)
            .take_while(|(segments, _)| segments.starts_with(prefix))
            .next()
            .is_some()
    }

    /// The strongest (lowest) priority stored anywhere under the given
    /// branch, ignoring entries of `exclude_owner`. `i32::MAX` when nothing
    /// is stored there.
    pub fn branch_highest_precedence(&self, path: &Path, exclude_owner: Option<&str>) -> i32 {
        let prefix = path.segments();
        self.index
            .range(prefix.to_vec()..)
            .take_while(|(segments, _)| segments.starts_with(prefix))
            .flat_map(|(_, updates)| updates.iter())
            .filter(|update| exclude_owner.is_none_or(|owner| update.owner() != owner))
            .map(Update::priority)
            .min()
            .unwrap_or(i32::MAX)
    }

    /// Read the running configuration leaf at the given path, used for lazy
    /// loading during navigation.
    pub fn read_running(&self, path: &Path) -> Result<Option<Update>, CacheError> {
        self.cache.read_running(path)
    }

    /// Resolve the schema element for a data path.
    pub fn get_schema(&self, path: &Path) -> Result<SchemaElem, SchemaError> {
        self.schema.get_schema(path)
    }
}

/// The set of paths an intent touches, deduplicated so the intended store is
/// queried once instead of per update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathSet(BTreeSet<Path>);

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: Path) {
        self.0.insert(path);
    }

    pub fn extend(&mut self, paths: impl IntoIterator<Item = Path>) {
        self.0.extend(paths);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> Vec<Path> {
        self.0.iter().cloned().collect()
    }
}
