// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::client::{SchemaClient, SchemaError};
use crate::elem::SchemaElem;
use crate::path::Path;

/// Memoizing front to a [`SchemaClient`], owned by a single transaction.
///
/// Data paths contain list key values (`/interface/eth0/mtu`); the schema
/// service only knows keyless paths (`/interface/mtu`). This cache performs
/// the translation by walking the path root-down and, at every keyed
/// container, skipping as many segments as the container declares keys.
/// Results are memoized per keyless path, so repeated lookups during tree
/// construction hit the service once per schema element.
pub struct SchemaCache {
    client: Arc<dyn SchemaClient>,
    index: RefCell<HashMap<Path, SchemaElem>>,
}

impl SchemaCache {
    pub fn new(client: Arc<dyn SchemaClient>) -> Self {
        Self {
            client,
            index: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve the schema element for a data path (key values included).
    /// The empty path resolves to the root element itself.
    pub fn get_schema(&self, path: &Path) -> Result<SchemaElem, SchemaError> {
        if path.is_root() {
            return self.lookup(&Path::root());
        }

        let segments = path.segments();
        let mut keyless = Path::root();
        let mut elem = None;
        let mut idx = 0;
        while idx < segments.len() {
            keyless.push(segments[idx].clone());
            let current = self.lookup(&keyless)?;
            idx += 1;
            // Skip the key value levels that follow a keyed container.
            if let SchemaElem::Container(container) = &current {
                idx += container.keys.len().min(segments.len() - idx);
            } else if idx < segments.len() {
                return Err(SchemaError::DescendIntoLeaf {
                    path: keyless,
                    segment: segments[idx].clone(),
                });
            }
            elem = Some(current);
        }
        elem.ok_or(SchemaError::NotFound { path: path.clone() })
    }

    /// Resolve one schema element per schema level of a data path, root-down.
    /// Key value levels contribute no element of their own.
    pub fn get_schema_elements(&self, path: &Path) -> Result<Vec<SchemaElem>, SchemaError> {
        let segments = path.segments();
        let mut keyless = Path::root();
        let mut elems = Vec::new();
        let mut idx = 0;
        while idx < segments.len() {
            keyless.push(segments[idx].clone());
            let current = self.lookup(&keyless)?;
            idx += 1;
            if let SchemaElem::Container(container) = &current {
                idx += container.keys.len().min(segments.len() - idx);
            } else if idx < segments.len() {
                return Err(SchemaError::DescendIntoLeaf {
                    path: keyless,
                    segment: segments[idx].clone(),
                });
            }
            elems.push(current);
        }
        Ok(elems)
    }

    fn lookup(&self, keyless: &Path) -> Result<SchemaElem, SchemaError> {
        if let Some(found) = self.index.borrow().get(keyless) {
            return Ok(found.clone());
        }
        let fetched = self.client.get_schema(keyless)?;
        self.index
            .borrow_mut()
            .insert(keyless.clone(), fetched.clone());
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::elem::{Container, Field, LeafType};

    /// Minimal two-level schema: interface[name]/{name,mtu}.
    struct CountingClient {
        calls: AtomicUsize,
    }

    impl SchemaClient for CountingClient {
        fn get_schema(&self, path: &Path) -> Result<SchemaElem, SchemaError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let elem = match path.to_string().as_str() {
                "/" => SchemaElem::Container(Container::new("")),
                "/interface" => SchemaElem::Container(Container {
                    keys: vec!["name".to_string()],
                    ..Container::new("interface")
                }),
                "/interface/name" => SchemaElem::Field(Field::new("name", LeafType::string())),
                "/interface/mtu" => SchemaElem::Field(Field::new("mtu", LeafType::uint())),
                _ => return Err(SchemaError::NotFound { path: path.clone() }),
            };
            Ok(elem)
        }
    }

    fn counting_cache() -> (SchemaCache, Arc<CountingClient>) {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
        });
        (SchemaCache::new(client.clone()), client)
    }

    #[test]
    fn root_resolves_to_the_root_element() {
        let (cache, _) = counting_cache();
        let elem = cache.get_schema(&Path::root()).unwrap();
        assert!(elem.is_container());
    }

    #[test]
    fn key_levels_are_skipped() {
        let (cache, _) = counting_cache();
        let elem = cache.get_schema(&Path::from("/interface/eth0/mtu")).unwrap();
        assert_eq!(elem.name(), "mtu");
    }

    #[test]
    fn lookups_are_memoized() {
        let (cache, client) = counting_cache();
        cache.get_schema(&Path::from("/interface/eth0/mtu")).unwrap();
        let after_first = client.calls.load(Ordering::Relaxed);
        cache.get_schema(&Path::from("/interface/eth1/mtu")).unwrap();
        // Second resolution reuses the memoized interface and mtu elements.
        assert_eq!(client.calls.load(Ordering::Relaxed), after_first);
    }

    #[test]
    fn descend_below_leaf_is_an_error() {
        let (cache, _) = counting_cache();
        let err = cache
            .get_schema(&Path::from("/interface/eth0/mtu/extra"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DescendIntoLeaf { .. }));
    }

    #[test]
    fn schema_elements_per_level() {
        let (cache, _) = counting_cache();
        let elems = cache
            .get_schema_elements(&Path::from("/interface/eth0/mtu"))
            .unwrap();
        assert_eq!(elems.len(), 2);
        assert_eq!(elems[0].name(), "interface");
        assert_eq!(elems[1].name(), "mtu");
    }
}
