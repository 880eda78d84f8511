// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};

use intentd_cache::{CacheClientBound, CacheOpts, Store};
use intentd_schema::{Path, TypedValue};

use crate::errors::DatastoreError;

const RAW_INTENT_PREFIX: &str = "__raw_intent__";
const RAW_INTENT_SEP: &str = "_";

/// The core request: a named, priority-tagged configuration fragment from a
/// single owner. Either `updates` is non-empty (apply) or `delete` is set
/// (withdraw the whole intent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetIntentRequest {
    /// Device name.
    pub name: String,
    /// Intent name, used as the owner of every resulting leaf variant.
    pub intent: String,
    /// Lower value is stronger.
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<IntentUpdate>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub delete: bool,
}

/// One path/value pair of an intent. JSON values are expanded into typed
/// leaf updates before they reach the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentUpdate {
    pub path: Path,
    pub value: TypedValue,
}

/// One entry of a `list_intent` response.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListedIntent {
    pub priority: i32,
    pub intent: String,
}

/// The persisted name of a raw intent blob:
/// `__raw_intent__<owner>_<priority>`.
pub fn raw_intent_name(intent: &str, priority: i32) -> String {
    format!("{RAW_INTENT_PREFIX}{intent}{RAW_INTENT_SEP}{priority}")
}

fn parse_raw_intent_name(name: &str) -> Result<ListedIntent, DatastoreError> {
    let malformed = || DatastoreError::MalformedIntentName {
        name: name.to_string(),
    };
    let stripped = name.strip_prefix(RAW_INTENT_PREFIX).ok_or_else(malformed)?;
    let (intent, priority) = stripped.rsplit_once(RAW_INTENT_SEP).ok_or_else(malformed)?;
    if intent.is_empty() {
        return Err(malformed());
    }
    let priority = priority.parse().map_err(|_| malformed())?;
    Ok(ListedIntent {
        priority,
        intent: intent.to_string(),
    })
}

/// Store the raw request blob in the intents store, overwriting any prior
/// blob of the same (owner, priority).
pub(crate) fn save_raw_intent(
    cache: &CacheClientBound,
    request: &SetIntentRequest,
) -> Result<(), DatastoreError> {
    let blob = serde_json::to_vec(request).map_err(|err| DatastoreError::InvalidUpdate {
        path: Path::root(),
        message: err.to_string(),
    })?;
    let name = raw_intent_name(&request.intent, request.priority);
    let update = cache.new_update(
        Path::from(vec![name]),
        TypedValue::Bytes(blob),
        request.priority,
        &request.intent,
    )?;
    cache.modify(&CacheOpts::store(Store::Intents), &[], &[update])?;
    Ok(())
}

pub(crate) fn delete_raw_intent(
    cache: &CacheClientBound,
    intent: &str,
    priority: i32,
) -> Result<(), DatastoreError> {
    let name = raw_intent_name(intent, priority);
    cache.modify(
        &CacheOpts::store(Store::Intents),
        &[Path::from(vec![name])],
        &[],
    )?;
    Ok(())
}

/// Read back a raw intent blob.
pub(crate) fn get_raw_intent(
    cache: &CacheClientBound,
    intent: &str,
    priority: i32,
) -> Result<SetIntentRequest, DatastoreError> {
    let name = raw_intent_name(intent, priority);
    let found = cache.read(
        &CacheOpts::store(Store::Intents),
        &[Path::from(vec![name])],
        0,
    )?;
    let Some(update) = found.first() else {
        return Err(DatastoreError::IntentNotFound {
            intent: intent.to_string(),
            priority,
        });
    };
    let TypedValue::Bytes(blob) = update.value().map_err(intentd_tree::TreeError::from)? else {
        return Err(DatastoreError::MalformedIntentName {
            name: raw_intent_name(intent, priority),
        });
    };
    serde_json::from_slice(&blob).map_err(|err| DatastoreError::InvalidUpdate {
        path: Path::root(),
        message: err.to_string(),
    })
}

/// Enumerate stored intents from the intents-store keys, ordered by
/// (priority, owner).
pub(crate) fn list_raw_intents(
    cache: &CacheClientBound,
) -> Result<Vec<ListedIntent>, DatastoreError> {
    let keys = cache.get_keys(Store::Intents)?;
    let mut intents = Vec::with_capacity(keys.len());
    for update in keys {
        let name = update
            .path()
            .last()
            .ok_or_else(|| DatastoreError::MalformedIntentName {
                name: update.path().to_string(),
            })?;
        intents.push(parse_raw_intent_name(name)?);
    }
    intents.sort();
    Ok(intents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_name_round_trip() {
        let name = raw_intent_name("owner1", 10);
        assert_eq!(name, "__raw_intent__owner1_10");
        let listed = parse_raw_intent_name(&name).unwrap();
        assert_eq!(listed.intent, "owner1");
        assert_eq!(listed.priority, 10);
    }

    #[test]
    fn raw_name_with_underscored_owner() {
        let name = raw_intent_name("my_intent_a", 5);
        let listed = parse_raw_intent_name(&name).unwrap();
        assert_eq!(listed.intent, "my_intent_a");
        assert_eq!(listed.priority, 5);
    }

    #[test]
    fn malformed_names_are_rejected() {
        assert!(parse_raw_intent_name("no-prefix_10").is_err());
        assert!(parse_raw_intent_name("__raw_intent__nopriority").is_err());
        assert!(parse_raw_intent_name("__raw_intent___10").is_err());
        assert!(parse_raw_intent_name("__raw_intent__owner_ten").is_err());
    }

    #[test]
    fn request_blob_round_trip() {
        let request = SetIntentRequest {
            name: "dev1".to_string(),
            intent: "owner1".to_string(),
            priority: 10,
            updates: vec![IntentUpdate {
                path: Path::from("/interface[name=eth0]/mtu"),
                value: TypedValue::Uint(1500),
            }],
            delete: false,
        };
        let blob = serde_json::to_vec(&request).unwrap();
        let back: SetIntentRequest = serde_json::from_slice(&blob).unwrap();
        assert_eq!(back, request);
    }
}
