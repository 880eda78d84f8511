// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use intentd_schema::{Path, TypedValue};

use crate::update::{Update, UpdateSlice};

/// The four cache partitions of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum Store {
    /// The device-observed running configuration.
    Config,
    /// All owner-scoped leaf variants.
    Intended,
    /// Raw intent blobs, keyed by their persisted name.
    Intents,
    /// Scratch namespace staging one transaction.
    Candidate,
}

/// Scoping options for a cache call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheOpts {
    pub store: Option<Store>,
    pub owner: Option<String>,
    pub priority: Option<i32>,
    /// Return updates without values.
    pub keys_only: bool,
}

impl CacheOpts {
    pub fn store(store: Store) -> Self {
        Self {
            store: Some(store),
            ..Default::default()
        }
    }

    pub fn owned(store: Store, owner: impl Into<String>, priority: i32) -> Self {
        Self {
            store: Some(store),
            owner: Some(owner.into()),
            priority: Some(priority),
            keys_only: false,
        }
    }
}

/// Client towards the cache store. All operations are device-scoped; the
/// implementation is expected to be concurrent-safe and to honor atomicity
/// of a single `modify` call.
pub trait CacheClient: Send + Sync {
    /// Read updates under the given path prefixes. `limit` of zero means
    /// unlimited.
    fn read(
        &self,
        device: &str,
        opts: &CacheOpts,
        paths: &[Path],
        limit: usize,
    ) -> Result<UpdateSlice, CacheError>;

    /// List all keys of a store as value-less updates.
    fn get_keys(&self, device: &str, store: Store) -> Result<UpdateSlice, CacheError>;

    /// Apply deletes then updates, atomically per call.
    fn modify(
        &self,
        device: &str,
        opts: &CacheOpts,
        deletes: &[Path],
        updates: &[Update],
    ) -> Result<(), CacheError>;

    fn create_candidate(&self, device: &str, name: &str) -> Result<(), CacheError>;

    fn delete_candidate(&self, device: &str, name: &str) -> Result<(), CacheError>;

    /// Construct an update record, stamping the cache's notion of time.
    fn new_update(
        &self,
        path: Path,
        value: TypedValue,
        priority: i32,
        owner: &str,
    ) -> Result<Update, CacheError> {
        Update::new(path, value, priority, owner, 0).map_err(|err| CacheError::Backend {
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum CacheError {
    #[display("device {device} is not known to the cache")]
    UnknownDevice { device: String },
    #[display("candidate {name} already exists for device {device}")]
    CandidateExists { device: String, name: String },
    #[display("candidate {name} does not exist for device {device}")]
    CandidateMissing { device: String, name: String },
    #[display("cache backend failure: {message}")]
    Backend { message: String },
}

/// A [`CacheClient`] bound to one device, the form the tree and the
/// transaction code consume.
#[derive(Clone)]
pub struct CacheClientBound {
    client: Arc<dyn CacheClient>,
    device: String,
}

impl CacheClientBound {
    pub fn new(device: impl Into<String>, client: Arc<dyn CacheClient>) -> Self {
        Self {
            client,
            device: device.into(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn client(&self) -> &Arc<dyn CacheClient> {
        &self.client
    }

    pub fn read(
        &self,
        opts: &CacheOpts,
        paths: &[Path],
        limit: usize,
    ) -> Result<UpdateSlice, CacheError> {
        self.client.read(&self.device, opts, paths, limit)
    }

    /// Read the running configuration value at exactly the given path.
    pub fn read_running(&self, path: &Path) -> Result<Option<Update>, CacheError> {
        let found = self.client.read(
            &self.device,
            &CacheOpts::store(Store::Config),
            std::slice::from_ref(path),
            0,
        )?;
        Ok(found.into_iter().find(|update| update.path() == path))
    }

    pub fn get_keys(&self, store: Store) -> Result<UpdateSlice, CacheError> {
        self.client.get_keys(&self.device, store)
    }

    pub fn modify(
        &self,
        opts: &CacheOpts,
        deletes: &[Path],
        updates: &[Update],
    ) -> Result<(), CacheError> {
        self.client.modify(&self.device, opts, deletes, updates)
    }

    pub fn create_candidate(&self, name: &str) -> Result<(), CacheError> {
        self.client.create_candidate(&self.device, name)
    }

    pub fn delete_candidate(&self, name: &str) -> Result<(), CacheError> {
        self.client.delete_candidate(&self.device, name)
    }

    pub fn new_update(
        &self,
        path: Path,
        value: TypedValue,
        priority: i32,
        owner: &str,
    ) -> Result<Update, CacheError> {
        self.client.new_update(path, value, priority, owner)
    }
}
