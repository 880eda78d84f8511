// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, error, info};
use parking_lot::Mutex;

use intentd_cache::{CacheClient, CacheClientBound, CacheOpts, Store, Update};
use intentd_schema::{Path, SchemaCache, SchemaClient};
use intentd_tree::{validation, PathSet, Tree, TreeContext};

use crate::errors::DatastoreError;
use crate::expand::expand_updates;
use crate::intent::{
    self, IntentUpdate, ListedIntent, SetIntentRequest,
};
use crate::southbound::{SetDataRequest, SouthboundTarget, SouthboundUpdate};

/// One managed device: its name, its bound services and the single-flight
/// lock serializing intent transactions.
pub struct Datastore {
    name: String,
    schema_client: Arc<dyn SchemaClient>,
    cache_client: Arc<dyn CacheClient>,
    southbound: Arc<dyn SouthboundTarget>,
    intent_lock: Mutex<()>,
}

impl Datastore {
    pub fn new(
        name: impl Into<String>,
        schema_client: Arc<dyn SchemaClient>,
        cache_client: Arc<dyn CacheClient>,
        southbound: Arc<dyn SouthboundTarget>,
    ) -> Self {
        Self {
            name: name.into(),
            schema_client,
            cache_client,
            southbound,
            intent_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read back the raw stored intent blob.
    pub fn get_intent(
        &self,
        intent: &str,
        priority: i32,
    ) -> Result<SetIntentRequest, DatastoreError> {
        intent::get_raw_intent(&self.bound_cache(), intent, priority)
    }

    /// Enumerate stored intents, ordered by (priority, owner).
    pub fn list_intent(&self) -> Result<Vec<ListedIntent>, DatastoreError> {
        intent::list_raw_intents(&self.bound_cache())
    }

    /// Apply or withdraw one intent, atomically for this device.
    ///
    /// The transaction runs under a try-lock: a busy device rejects
    /// immediately with a retryable error rather than queueing. All staging
    /// happens in a cache candidate which is removed on every exit path.
    pub fn set_intent(&self, request: &SetIntentRequest) -> Result<(), DatastoreError> {
        let Some(_guard) = self.intent_lock.try_lock() else {
            return Err(DatastoreError::Busy {
                device: self.name.clone(),
            });
        };

        info!(
            "received set intent request: ds={} intent={} priority={}",
            self.name, request.intent, request.priority
        );
        let candidate = format!("{}-{}", request.intent, nanotime());
        let cache = self.bound_cache();
        cache.create_candidate(&candidate)?;

        let outcome = if !request.updates.is_empty() {
            self.set_intent_update(&cache, request, &candidate)
        } else if request.delete {
            self.set_intent_delete(&cache, request, &candidate)
        } else {
            Ok(())
        };

        // The candidate is discarded on success and failure alike.
        if let Err(err) = cache.delete_candidate(&candidate) {
            error!(
                "{}: failed to delete candidate {}: {}",
                self.name, candidate, err
            );
        }
        if let Err(err) = &outcome {
            error!("{}: set intent {} failed: {}", self.name, request.intent, err);
        }
        outcome
    }

    /// Process a new or updated intent.
    ///
    /// The tree is populated with the stored state of every touched path,
    /// the owner's prior leaves are flagged for deletion, the request leaves
    /// re-assert or replace them, and the finalized tree yields the
    /// southbound deltas and the owner-scoped cache writeback.
    fn set_intent_update(
        &self,
        cache: &CacheClientBound,
        request: &SetIntentRequest,
        candidate: &str,
    ) -> Result<(), DatastoreError> {
        debug!("{}: set intent update start", self.name);
        let mut context = TreeContext::new(
            &request.intent,
            SchemaCache::new(self.schema_client.clone()),
            cache.clone(),
        );
        context.load_store_index()?;

        let expanded = expand_updates(&context, &request.updates)?;
        let mut path_set = PathSet::new();
        let mut new_updates = Vec::with_capacity(expanded.len());
        for IntentUpdate { path, value } in expanded {
            path_set.add(path.clone());
            new_updates.push(cache.new_update(path, value, request.priority, &request.intent)?);
        }
        // Paths the owner stored previously must load too, so leaves absent
        // from this request surface as deletions.
        path_set.extend(context.paths_for_owner(&request.intent));

        let mut tree = Tree::new(context)?;
        load_intended(&mut tree, &path_set)?;
        tree.mark_owner_delete(&request.intent);
        for update in &new_updates {
            tree.add_update(update, true)?;
        }
        debug!("tree:\n{tree}");
        tree.finish_insertion_phase();

        let result = validation::validate(&mut tree)?;
        if !result.is_ok() {
            return Err(DatastoreError::Validation(result));
        }

        let updates = tree.get_highest_precedence(true);
        let deletes = tree.get_deletes();
        self.apply_intent(candidate, &updates, &deletes)?;

        self.persist(cache, request, &tree, &updates, &deletes)?;
        intent::save_raw_intent(cache, request)?;
        info!("ds={} intent={}: intent saved", self.name, request.intent);
        debug!("{}: set intent update end", self.name);
        Ok(())
    }

    /// Withdraw an intent: load everything the owner stored, flag it for
    /// deletion and let the merge surface fallback values of other owners.
    fn set_intent_delete(
        &self,
        cache: &CacheClientBound,
        request: &SetIntentRequest,
        candidate: &str,
    ) -> Result<(), DatastoreError> {
        debug!("{}: set intent delete start", self.name);
        let mut context = TreeContext::new(
            &request.intent,
            SchemaCache::new(self.schema_client.clone()),
            cache.clone(),
        );
        context.load_store_index()?;

        let mut path_set = PathSet::new();
        path_set.extend(context.paths_for_owner(&request.intent));

        let mut tree = Tree::new(context)?;
        load_intended(&mut tree, &path_set)?;
        tree.mark_owner_delete(&request.intent);
        tree.finish_insertion_phase();

        let result = validation::validate(&mut tree)?;
        if !result.is_ok() {
            return Err(DatastoreError::Validation(result));
        }

        let updates = tree.get_highest_precedence(true);
        let deletes = tree.get_deletes();
        self.apply_intent(candidate, &updates, &deletes)?;

        self.persist(cache, request, &tree, &updates, &deletes)?;
        intent::delete_raw_intent(cache, &request.intent, request.priority)?;
        info!("ds={} intent={}: intent deleted", self.name, request.intent);
        debug!("{}: set intent delete end", self.name);
        Ok(())
    }

    /// Push the computed deltas to the device. Nothing is sent when there is
    /// nothing to change; a southbound failure aborts the transaction before
    /// any store mutation.
    fn apply_intent(
        &self,
        candidate: &str,
        updates: &[Update],
        deletes: &[Path],
    ) -> Result<(), DatastoreError> {
        let mut southbound_request = SetDataRequest {
            updates: Vec::with_capacity(updates.len()),
            deletes: deletes.to_vec(),
        };
        for update in updates {
            southbound_request.updates.push(SouthboundUpdate {
                path: update.path().clone(),
                value: update.value().map_err(intentd_tree::TreeError::from)?,
            });
        }
        if southbound_request.is_empty() {
            debug!("{}: nothing to push southbound", self.name);
            return Ok(());
        }
        info!(
            "datastore {}/{} applying intent: num_updates={} num_deletes={}",
            self.name,
            candidate,
            southbound_request.updates.len(),
            southbound_request.deletes.len()
        );
        self.southbound.set(candidate, &southbound_request)?;
        Ok(())
    }

    /// Persist the transaction outcome: the owner-scoped deltas into the
    /// intended store, then an optimistic writeback of the device-visible
    /// deltas into the config store. The latter runs after the southbound
    /// commit succeeded and is never rolled back on the device.
    fn persist(
        &self,
        cache: &CacheClientBound,
        request: &SetIntentRequest,
        tree: &Tree,
        updates: &[Update],
        deletes: &[Path],
    ) -> Result<(), DatastoreError> {
        let updates_owner = tree.get_updates_for_owner(&request.intent);
        let deletes_owner = tree.get_deletes_for_owner(&request.intent);
        debug!(
            "{}: owner deltas: {} updates, {} deletes",
            self.name,
            updates_owner.len(),
            deletes_owner.len()
        );
        cache
            .modify(
                &CacheOpts::owned(Store::Intended, &request.intent, request.priority),
                &deletes_owner,
                &updates_owner,
            )
            .map_err(|err| {
                error!("failed updating the intended store for {}: {}", self.name, err);
                err
            })?;

        if let Err(err) = cache.modify(&CacheOpts::store(Store::Config), deletes, updates) {
            // The device already committed; the config store converges on the
            // next sync instead of rolling back.
            error!(
                "failed updating the running config store for {}: {}",
                self.name, err
            );
            return Err(err.into());
        }
        Ok(())
    }

    fn bound_cache(&self) -> CacheClientBound {
        CacheClientBound::new(&self.name, self.cache_client.clone())
    }
}

/// Read all touched paths from the intended store in one query and feed
/// them into the tree as existing (not new) leaves.
fn load_intended(tree: &mut Tree, path_set: &PathSet) -> Result<(), DatastoreError> {
    if path_set.is_empty() {
        return Ok(());
    }
    let stored = tree.context().cache().read(
        &CacheOpts::store(Store::Intended),
        &path_set.paths(),
        0,
    )?;
    for update in &stored {
        tree.add_update(update, false)?;
    }
    Ok(())
}

fn nanotime() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default()
}
