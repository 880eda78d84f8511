// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

//! Expansion of JSON intent payloads into typed leaf updates.
//!
//! A request update may target a branch and carry a JSON document for the
//! whole subtree. Expansion walks the document alongside the schema:
//! objects recurse through container children, arrays below a keyed
//! container fan out per list instance (the key leaves become leaf updates
//! of their own), leaf-lists collect into a single leaf-list value.

use intentd_schema::{LeafKind, LeafType, Path, SchemaElem, TypedValue};
use intentd_tree::TreeContext;

use crate::errors::DatastoreError;
use crate::intent::IntentUpdate;

/// Expand every JSON-valued update of a request; typed updates pass through
/// unchanged but are checked against their leaf schema. The key leaves of
/// every touched list instance are added as updates of their own, so an
/// instance never exists without its keys.
pub(crate) fn expand_updates(
    context: &TreeContext,
    updates: &[IntentUpdate],
) -> Result<Vec<IntentUpdate>, DatastoreError> {
    let mut expanded = Vec::with_capacity(updates.len());
    for update in updates {
        match &update.value {
            TypedValue::Json(document) => {
                expand_json(context, update.path.clone(), document, &mut expanded)?;
            }
            value => {
                validate_typed(context, &update.path, value)?;
                expanded.push(update.clone());
            }
        }
    }
    add_keys_as_leaves(context, &mut expanded)?;
    Ok(expanded)
}

/// Derive an update for every key leaf along the expanded paths. A path
/// like `/interface/eth0/mtu` implies `/interface/eth0/name = eth0`.
fn add_keys_as_leaves(
    context: &TreeContext,
    updates: &mut Vec<IntentUpdate>,
) -> Result<(), DatastoreError> {
    let mut seen: std::collections::BTreeSet<Path> =
        updates.iter().map(|update| update.path.clone()).collect();
    let mut derived = Vec::new();
    for update in updates.iter() {
        let segments = update.path.segments().to_vec();
        let mut walked = Path::root();
        let mut idx = 0;
        while idx < segments.len() {
            walked.push(segments[idx].clone());
            let elem = context.get_schema(&walked)?;
            idx += 1;
            if let SchemaElem::Container(container) = elem {
                let available = container.keys.len().min(segments.len() - idx);
                for offset in 0..available {
                    walked.push(segments[idx + offset].clone());
                }
                if available == container.keys.len() && available > 0 {
                    for (offset, key) in container.keys.iter().enumerate() {
                        let leaf_path = walked.join(key.clone());
                        if !seen.insert(leaf_path.clone()) {
                            continue;
                        }
                        let key_schema = context.get_schema(&leaf_path)?;
                        let Some(field) = key_schema.as_field() else {
                            continue;
                        };
                        let key_value = serde_json::Value::String(segments[idx + offset].clone());
                        derived.push(IntentUpdate {
                            value: coerce_json(&leaf_path, &field.typ, &key_value)?,
                            path: leaf_path,
                        });
                    }
                }
                idx += available;
            }
        }
    }
    updates.extend(derived);
    Ok(())
}

fn expand_json(
    context: &TreeContext,
    path: Path,
    document: &serde_json::Value,
    out: &mut Vec<IntentUpdate>,
) -> Result<(), DatastoreError> {
    if path.is_root() {
        let object = as_object(&path, document)?;
        for (child, value) in object {
            expand_json(context, path.join(child.clone()), value, out)?;
        }
        return Ok(());
    }

    match context.get_schema(&path)? {
        SchemaElem::Container(container) if !container.keys.is_empty() => {
            let instances = document
                .as_array()
                .ok_or_else(|| invalid(&path, "keyed container expects a JSON array"))?;
            for instance in instances {
                let object = as_object(&path, instance)?;
                let mut instance_path = path.clone();
                for key in &container.keys {
                    let key_value = object.get(key).ok_or_else(|| {
                        invalid(&path, &format!("list instance misses key '{key}'"))
                    })?;
                    instance_path.push(json_key_string(key_value));
                }
                for (child, value) in object {
                    expand_json(context, instance_path.join(child.clone()), value, out)?;
                }
            }
        }
        SchemaElem::Container(_) => {
            let object = as_object(&path, document)?;
            for (child, value) in object {
                expand_json(context, path.join(child.clone()), value, out)?;
            }
        }
        SchemaElem::Field(field) => {
            let value = coerce_json(&path, &field.typ, document)?;
            out.push(IntentUpdate { path, value });
        }
        SchemaElem::LeafList(leaf_list) => {
            let items = document
                .as_array()
                .ok_or_else(|| invalid(&path, "leaf-list expects a JSON array"))?;
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(coerce_json(&path, &leaf_list.typ, item)?);
            }
            out.push(IntentUpdate {
                path,
                value: TypedValue::Leaflist(values),
            });
        }
    }
    Ok(())
}

/// Coerce one JSON scalar into the typed value its leaf schema demands.
fn coerce_json(
    path: &Path,
    typ: &LeafType,
    value: &serde_json::Value,
) -> Result<TypedValue, DatastoreError> {
    let coerced = match typ.kind {
        LeafKind::Bool => value.as_bool().map(TypedValue::Bool),
        LeafKind::Int => value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .map(TypedValue::Int),
        LeafKind::Uint => value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .map(TypedValue::Uint),
        LeafKind::String | LeafKind::Leafref => {
            value.as_str().map(|s| TypedValue::String(s.to_string()))
        }
        LeafKind::Binary => value
            .as_str()
            .map(|s| TypedValue::Bytes(s.as_bytes().to_vec())),
        LeafKind::Identityref => value.as_str().map(|s| match s.split_once(':') {
            Some((prefix, name)) => TypedValue::Identity {
                prefix: prefix.to_string(),
                value: name.to_string(),
            },
            None => TypedValue::Identity {
                prefix: typ.identity_prefix.clone().unwrap_or_default(),
                value: s.to_string(),
            },
        }),
    };
    let coerced = coerced
        .ok_or_else(|| invalid(path, &format!("cannot coerce '{value}' to {}", typ.kind)))?;
    typ.accepts(&coerced)
        .map_err(|err| invalid(path, &err.to_string()))?;
    Ok(coerced)
}

/// Precondition check for updates that arrive already typed.
fn validate_typed(
    context: &TreeContext,
    path: &Path,
    value: &TypedValue,
) -> Result<(), DatastoreError> {
    match context.get_schema(path)? {
        SchemaElem::Field(field) => field
            .typ
            .accepts(value)
            .map_err(|err| invalid(path, &err.to_string())),
        SchemaElem::LeafList(leaf_list) => {
            let TypedValue::Leaflist(items) = value else {
                return Err(invalid(path, "leaf-list expects a leaf-list value"));
            };
            for item in items {
                leaf_list
                    .typ
                    .accepts(item)
                    .map_err(|err| invalid(path, &err.to_string()))?;
            }
            Ok(())
        }
        SchemaElem::Container(container) if container.is_presence => Ok(()),
        SchemaElem::Container(_) => Err(invalid(path, "cannot set a value on a container")),
    }
}

fn as_object<'a>(
    path: &Path,
    value: &'a serde_json::Value,
) -> Result<&'a serde_json::Map<String, serde_json::Value>, DatastoreError> {
    value
        .as_object()
        .ok_or_else(|| invalid(path, "expected a JSON object"))
}

/// Render a JSON scalar the way it appears as a key segment.
fn json_key_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid(path: &Path, message: &str) -> DatastoreError {
    DatastoreError::InvalidUpdate {
        path: path.clone(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use intentd_cache::CacheClientBound;
    use intentd_schema::SchemaCache;
    use intentd_testutil::{InMemoryCache, TestSchemaClient};
    use serde_json::json;

    fn context() -> TreeContext {
        let cache = Arc::new(InMemoryCache::new());
        TreeContext::new(
            "owner1",
            SchemaCache::new(Arc::new(TestSchemaClient)),
            CacheClientBound::new("dev1", cache),
        )
    }

    fn expand(path: &str, document: serde_json::Value) -> Result<Vec<IntentUpdate>, DatastoreError> {
        let context = context();
        expand_updates(
            &context,
            &[IntentUpdate {
                path: Path::from(path),
                value: TypedValue::Json(document),
            }],
        )
    }

    #[test]
    fn expand_keyed_list() {
        let updates = expand(
            "/",
            json!({
                "interface": [
                    {"name": "eth0", "mtu": 1500, "description": "uplink"},
                    {"name": "eth1", "mtu": 9000},
                ]
            }),
        )
        .unwrap();

        let rendered: Vec<String> = updates
            .iter()
            .map(|u| format!("{}={}", u.path, u.value))
            .collect();
        assert!(rendered.contains(&"/interface/eth0/name=eth0".to_string()));
        assert!(rendered.contains(&"/interface/eth0/mtu=1500".to_string()));
        assert!(rendered.contains(&"/interface/eth0/description=uplink".to_string()));
        assert!(rendered.contains(&"/interface/eth1/name=eth1".to_string()));
        assert!(rendered.contains(&"/interface/eth1/mtu=9000".to_string()));
        assert_eq!(updates.len(), 5);
    }

    #[test]
    fn expand_plain_container() {
        let updates = expand("/sys", json!({"hostname": "router1"})).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].path, Path::from("/sys/hostname"));
        assert_eq!(updates[0].value, TypedValue::String("router1".to_string()));
    }

    #[test]
    fn expand_identityref() {
        let updates = expand("/crypto", json!({"algo": "alg:des3"})).unwrap();
        assert_eq!(
            updates[0].value,
            TypedValue::Identity {
                prefix: "alg".to_string(),
                value: "des3".to_string(),
            }
        );
    }

    #[test]
    fn expand_rejects_out_of_range() {
        let err = expand("/interface", json!([{"name": "eth0", "mtu": 100000}])).unwrap_err();
        assert!(matches!(err, DatastoreError::InvalidUpdate { .. }));
    }

    #[test]
    fn expand_rejects_missing_key() {
        let err = expand("/interface", json!([{"mtu": 1500}])).unwrap_err();
        assert!(matches!(err, DatastoreError::InvalidUpdate { .. }));
    }

    #[test]
    fn key_leaves_are_derived_from_paths() {
        let context = context();
        let updates = expand_updates(
            &context,
            &[IntentUpdate {
                path: Path::from("/interface[name=eth0]/mtu"),
                value: TypedValue::Uint(9000),
            }],
        )
        .unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].path, Path::from("/interface/eth0/name"));
        assert_eq!(updates[1].value, TypedValue::String("eth0".to_string()));
    }

    #[test]
    fn typed_update_is_validated() {
        let context = context();
        let err = expand_updates(
            &context,
            &[IntentUpdate {
                path: Path::from("/interface[name=eth0]/mtu"),
                value: TypedValue::String("fast".to_string()),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, DatastoreError::InvalidUpdate { .. }));
    }
}
