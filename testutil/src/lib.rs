// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.
#![deny(unused_crate_dependencies)]

//! Shared test fixtures: a small programmatic device schema and an
//! in-memory cache client backing all four stores.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::Mutex;

use intentd_cache::{CacheClient, CacheError, CacheOpts, Store, Update, UpdateSlice};
use intentd_schema::{
    ChoiceInfo, Container, Field, LeafList, LeafType, Path, SchemaClient, SchemaElem, SchemaError,
    TypedValue,
};

/// A fixed device schema used across the test suites:
///
/// ```text
/// /                        root container
/// /interface[name]         keys: name
///     name                 string
///     mtu                  uint, range 0..9216
///     description          string
/// /mgmt
///     interface-name       leafref -> /interface/name
/// /sys                     mandatory: hostname
///     hostname             string
///     location             string
/// /tunnel                  choice encap { gre: [gre-key], vxlan: [vni] }
///     gre-key              uint
///     vni                  uint
/// /crypto
///     algo                 identityref, prefix alg
/// /qos
///     enabled              bool
///     queues               uint, range 0..8, must "../enabled = 'true'"
///     dscp                 leaf-list of uint
/// ```
pub struct TestSchemaClient;

impl SchemaClient for TestSchemaClient {
    fn get_schema(&self, path: &Path) -> Result<SchemaElem, SchemaError> {
        let elem = match path.to_string().as_str() {
            "/" => SchemaElem::Container(Container::new("")),
            "/interface" => SchemaElem::Container(Container {
                keys: vec!["name".to_string()],
                ..Container::new("interface")
            }),
            "/interface/name" => SchemaElem::Field(Field::new("name", LeafType::string())),
            "/interface/mtu" => {
                SchemaElem::Field(Field::new("mtu", LeafType::uint().with_range(0, 9216)))
            }
            "/interface/description" => {
                SchemaElem::Field(Field::new("description", LeafType::string()))
            }
            "/mgmt" => SchemaElem::Container(Container::new("mgmt")),
            "/mgmt/interface-name" => SchemaElem::Field(Field::new(
                "interface-name",
                LeafType::leafref("/interface/name"),
            )),
            "/sys" => SchemaElem::Container(Container {
                mandatory_children: vec!["hostname".to_string()],
                ..Container::new("sys")
            }),
            "/sys/hostname" => SchemaElem::Field(Field::new("hostname", LeafType::string())),
            "/sys/location" => SchemaElem::Field(Field::new("location", LeafType::string())),
            "/tunnel" => SchemaElem::Container(Container {
                choice_info: Some(
                    ChoiceInfo::builder()
                        .case("encap", "gre", &["gre-key"])
                        .case("encap", "vxlan", &["vni"])
                        .build(),
                ),
                ..Container::new("tunnel")
            }),
            "/tunnel/gre-key" => SchemaElem::Field(Field::new("gre-key", LeafType::uint())),
            "/tunnel/vni" => SchemaElem::Field(Field::new("vni", LeafType::uint())),
            "/crypto" => SchemaElem::Container(Container::new("crypto")),
            "/crypto/algo" => SchemaElem::Field(Field::new("algo", LeafType::identityref("alg"))),
            "/qos" => SchemaElem::Container(Container::new("qos")),
            "/qos/enabled" => SchemaElem::Field(Field::new("enabled", LeafType::boolean())),
            "/qos/queues" => SchemaElem::Field(Field::new(
                "queues",
                LeafType::uint()
                    .with_range(0, 8)
                    .with_must("../enabled = 'true'"),
            )),
            "/qos/dscp" => SchemaElem::LeafList(LeafList::new("dscp", LeafType::uint())),
            _ => return Err(SchemaError::NotFound { path: path.clone() }),
        };
        Ok(elem)
    }
}

/// In-memory cache client covering all four stores of any number of
/// devices. Device stores appear on first use.
#[derive(Default)]
pub struct InMemoryCache {
    inner: Mutex<HashMap<String, DeviceStores>>,
}

#[derive(Default)]
struct DeviceStores {
    /// Running configuration, one value per path.
    config: BTreeMap<Vec<String>, Update>,
    /// Owner-scoped variants, several per path.
    intended: BTreeMap<Vec<String>, Vec<Update>>,
    /// Raw intent blobs, keyed by their single-segment name.
    intents: BTreeMap<Vec<String>, Update>,
    candidates: BTreeSet<String>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a running-config leaf, as the device sync would.
    pub fn seed_running(
        &self,
        device: &str,
        path: Path,
        value: TypedValue,
    ) -> Result<(), CacheError> {
        let update = Update::new(path, value, i32::MAX, "running", 0).map_err(|err| {
            CacheError::Backend {
                message: err.to_string(),
            }
        })?;
        let mut inner = self.inner.lock();
        let stores = inner.entry(device.to_string()).or_default();
        stores
            .config
            .insert(update.path().segments().to_vec(), update);
        Ok(())
    }

    /// Snapshot of the intended store of a device, for assertions.
    pub fn intended_snapshot(&self, device: &str) -> Vec<Update> {
        let inner = self.inner.lock();
        inner
            .get(device)
            .map(|stores| stores.intended.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the config store of a device, for assertions.
    pub fn config_snapshot(&self, device: &str) -> Vec<Update> {
        let inner = self.inner.lock();
        inner
            .get(device)
            .map(|stores| stores.config.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn candidate_count(&self, device: &str) -> usize {
        let inner = self.inner.lock();
        inner
            .get(device)
            .map(|stores| stores.candidates.len())
            .unwrap_or_default()
    }
}

fn matches_scope(update: &Update, opts: &CacheOpts) -> bool {
    opts.owner
        .as_deref()
        .is_none_or(|owner| update.owner() == owner)
        && opts.priority.is_none_or(|priority| update.priority() == priority)
}

fn prefix_match(segments: &[String], paths: &[Path]) -> bool {
    paths.iter().any(|path| {
        segments.starts_with(path.segments())
            || path.segments().first().is_some_and(|first| first == "*")
    })
}

impl CacheClient for InMemoryCache {
    fn read(
        &self,
        device: &str,
        opts: &CacheOpts,
        paths: &[Path],
        limit: usize,
    ) -> Result<UpdateSlice, CacheError> {
        let inner = self.inner.lock();
        let Some(stores) = inner.get(device) else {
            return Ok(UpdateSlice::new());
        };
        let mut result: UpdateSlice = match opts.store.unwrap_or(Store::Intended) {
            Store::Config => stores
                .config
                .iter()
                .filter(|(segments, _)| prefix_match(segments, paths))
                .map(|(_, update)| update.clone())
                .collect(),
            Store::Intended => stores
                .intended
                .iter()
                .filter(|(segments, _)| prefix_match(segments, paths))
                .flat_map(|(_, updates)| updates.iter())
                .filter(|update| matches_scope(update, opts))
                .cloned()
                .collect(),
            Store::Intents => stores
                .intents
                .iter()
                .filter(|(segments, _)| prefix_match(segments, paths))
                .map(|(_, update)| update.clone())
                .collect(),
            Store::Candidate => UpdateSlice::new(),
        };
        if opts.keys_only {
            result = result
                .into_iter()
                .map(|update| {
                    Update::key_only(update.path().clone(), update.priority(), update.owner())
                })
                .collect();
        }
        if limit > 0 {
            result.truncate(limit);
        }
        Ok(result)
    }

    fn get_keys(&self, device: &str, store: Store) -> Result<UpdateSlice, CacheError> {
        let inner = self.inner.lock();
        let Some(stores) = inner.get(device) else {
            return Ok(UpdateSlice::new());
        };
        let keys = match store {
            Store::Config => stores.config.values().cloned().collect::<Vec<_>>(),
            Store::Intended => stores.intended.values().flatten().cloned().collect(),
            Store::Intents => stores.intents.values().cloned().collect(),
            Store::Candidate => Vec::new(),
        };
        Ok(keys
            .into_iter()
            .map(|update| {
                Update::key_only(update.path().clone(), update.priority(), update.owner())
            })
            .collect())
    }

    fn modify(
        &self,
        device: &str,
        opts: &CacheOpts,
        deletes: &[Path],
        updates: &[Update],
    ) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        let stores = inner.entry(device.to_string()).or_default();
        match opts.store.unwrap_or(Store::Intended) {
            Store::Config => {
                for delete in deletes {
                    // Southbound-style deletes cover whole branches.
                    stores
                        .config
                        .retain(|segments, _| !segments.starts_with(delete.segments()));
                }
                for update in updates {
                    stores
                        .config
                        .insert(update.path().segments().to_vec(), update.clone());
                }
            }
            Store::Intended => {
                for delete in deletes {
                    let segments = delete.segments().to_vec();
                    if let Some(variants) = stores.intended.get_mut(&segments) {
                        variants.retain(|variant| !matches_scope(variant, opts));
                        if variants.is_empty() {
                            stores.intended.remove(&segments);
                        }
                    }
                }
                for update in updates {
                    let variants = stores
                        .intended
                        .entry(update.path().segments().to_vec())
                        .or_default();
                    variants.retain(|variant| {
                        !(variant.owner() == update.owner()
                            && variant.priority() == update.priority())
                    });
                    variants.push(update.clone());
                }
            }
            Store::Intents => {
                for delete in deletes {
                    stores.intents.remove(delete.segments());
                }
                for update in updates {
                    stores
                        .intents
                        .insert(update.path().segments().to_vec(), update.clone());
                }
            }
            Store::Candidate => {}
        }
        Ok(())
    }

    fn create_candidate(&self, device: &str, name: &str) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        let stores = inner.entry(device.to_string()).or_default();
        if !stores.candidates.insert(name.to_string()) {
            return Err(CacheError::CandidateExists {
                device: device.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn delete_candidate(&self, device: &str, name: &str) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        let Some(stores) = inner.get_mut(device) else {
            return Err(CacheError::UnknownDevice {
                device: device.to_string(),
            });
        };
        if !stores.candidates.remove(name) {
            return Err(CacheError::CandidateMissing {
                device: device.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_serves_keyless_paths() {
        let client = TestSchemaClient;
        let elem = client.get_schema(&Path::from("/interface/mtu")).unwrap();
        assert_eq!(elem.name(), "mtu");
        assert!(client.get_schema(&Path::from("/nope")).is_err());
    }

    #[test]
    fn intended_modify_is_owner_scoped() {
        let cache = InMemoryCache::new();
        let path = Path::from("/interface/eth0/mtu");
        let a = Update::new(path.clone(), TypedValue::Uint(1500), 10, "a", 0).unwrap();
        let b = Update::new(path.clone(), TypedValue::Uint(9000), 5, "b", 0).unwrap();
        cache
            .modify(
                "dev1",
                &CacheOpts::store(Store::Intended),
                &[],
                &[a.clone(), b],
            )
            .unwrap();

        // Deleting owner b keeps owner a in place.
        cache
            .modify(
                "dev1",
                &CacheOpts::owned(Store::Intended, "b", 5),
                &[path.clone()],
                &[],
            )
            .unwrap();
        let remaining = cache.intended_snapshot("dev1");
        assert_eq!(remaining, vec![a]);
    }

    #[test]
    fn candidates_are_tracked() {
        let cache = InMemoryCache::new();
        cache.create_candidate("dev1", "owner1-1").unwrap();
        assert!(cache.create_candidate("dev1", "owner1-1").is_err());
        cache.delete_candidate("dev1", "owner1-1").unwrap();
        assert!(cache.delete_candidate("dev1", "owner1-1").is_err());
        assert_eq!(cache.candidate_count("dev1"), 0);
    }
}
