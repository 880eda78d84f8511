// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use serde_json::json;

use intentd_datastore::{
    Datastore, DatastoreError, ErrorCode, IntentUpdate, SetDataRequest, SetIntentRequest,
    SouthboundError, SouthboundTarget,
};
use intentd_schema::{Path, TypedValue};
use intentd_testutil::{InMemoryCache, TestSchemaClient};

const DEVICE: &str = "dev1";

/// Southbound mock that records every committed request.
#[derive(Default)]
struct RecordingTarget {
    requests: Mutex<Vec<SetDataRequest>>,
    fail_with: Mutex<Option<SouthboundError>>,
}

impl RecordingTarget {
    fn last(&self) -> SetDataRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn fail_next(&self, err: SouthboundError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }
}

impl SouthboundTarget for RecordingTarget {
    fn set(&self, _candidate: &str, request: &SetDataRequest) -> Result<(), SouthboundError> {
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

struct Fixture {
    datastore: Datastore,
    cache: Arc<InMemoryCache>,
    southbound: Arc<RecordingTarget>,
}

fn fixture() -> Fixture {
    let cache = Arc::new(InMemoryCache::new());
    let southbound = Arc::new(RecordingTarget::default());
    let datastore = Datastore::new(
        DEVICE,
        Arc::new(TestSchemaClient),
        cache.clone(),
        southbound.clone(),
    );
    Fixture {
        datastore,
        cache,
        southbound,
    }
}

fn typed(intent: &str, priority: i32, path: &str, value: TypedValue) -> SetIntentRequest {
    SetIntentRequest {
        name: DEVICE.to_string(),
        intent: intent.to_string(),
        priority,
        updates: vec![IntentUpdate {
            path: Path::from(path),
            value,
        }],
        delete: false,
    }
}

fn json_intent(intent: &str, priority: i32, path: &str, value: serde_json::Value) -> SetIntentRequest {
    typed(intent, priority, path, TypedValue::Json(value))
}

fn delete_intent(intent: &str, priority: i32) -> SetIntentRequest {
    SetIntentRequest {
        name: DEVICE.to_string(),
        intent: intent.to_string(),
        priority,
        updates: Vec::new(),
        delete: true,
    }
}

fn update_value(request: &SetDataRequest, path: &str) -> Option<TypedValue> {
    let path = Path::from(path);
    request
        .updates
        .iter()
        .find(|u| u.path == path)
        .map(|u| u.value.clone())
}

#[test]
fn stronger_intent_wins_the_leaf() {
    let f = fixture();
    f.datastore
        .set_intent(&typed("a", 10, "/interface[name=eth0]/mtu", TypedValue::Uint(1500)))
        .unwrap();
    f.datastore
        .set_intent(&typed("b", 5, "/interface[name=eth0]/mtu", TypedValue::Uint(9000)))
        .unwrap();

    let pushed = f.southbound.last();
    assert_eq!(
        update_value(&pushed, "/interface/eth0/mtu"),
        Some(TypedValue::Uint(9000))
    );
    assert!(pushed.deletes.is_empty());

    // Both owners persist their claim in the intended store.
    let intended = f.cache.intended_snapshot(DEVICE);
    let owners: Vec<&str> = intended
        .iter()
        .filter(|u| u.path() == &Path::from("/interface/eth0/mtu"))
        .map(|u| u.owner())
        .collect();
    assert!(owners.contains(&"a"));
    assert!(owners.contains(&"b"));
}

#[test]
fn deleting_the_stronger_intent_falls_back() {
    let f = fixture();
    f.datastore
        .set_intent(&typed("a", 10, "/interface[name=eth0]/mtu", TypedValue::Uint(1500)))
        .unwrap();
    f.datastore
        .set_intent(&typed("b", 5, "/interface[name=eth0]/mtu", TypedValue::Uint(9000)))
        .unwrap();
    f.datastore.set_intent(&delete_intent("b", 5)).unwrap();

    let pushed = f.southbound.last();
    assert_eq!(
        update_value(&pushed, "/interface/eth0/mtu"),
        Some(TypedValue::Uint(1500))
    );
    assert!(!pushed.deletes.contains(&Path::from("/interface/eth0/mtu")));

    // Owner b is gone from the intended store, owner a remains.
    let intended = f.cache.intended_snapshot(DEVICE);
    assert!(intended.iter().all(|u| u.owner() != "b"));
    assert!(intended.iter().any(|u| u.owner() == "a"));
}

#[test]
fn withdrawing_an_instance_aggregates_deletes() {
    let f = fixture();
    f.datastore
        .set_intent(&json_intent(
            "a",
            10,
            "/",
            json!({
                "interface": [
                    {"name": "eth1", "mtu": 1500, "description": "x"}
                ]
            }),
        ))
        .unwrap();
    f.datastore.set_intent(&delete_intent("a", 10)).unwrap();

    let pushed = f.southbound.last();
    assert!(pushed.updates.is_empty());
    assert_eq!(pushed.deletes, vec![Path::from("/interface/eth1")]);

    assert!(f.cache.intended_snapshot(DEVICE).is_empty());
    assert!(f.cache.config_snapshot(DEVICE).is_empty());
}

#[test]
fn choice_switch_pushes_new_case_and_deletes_old() {
    let f = fixture();
    f.datastore
        .set_intent(&typed("a", 10, "/tunnel/gre-key", TypedValue::Uint(1)))
        .unwrap();
    f.datastore
        .set_intent(&typed("b", 5, "/tunnel/vni", TypedValue::Uint(2)))
        .unwrap();

    let pushed = f.southbound.last();
    assert_eq!(
        update_value(&pushed, "/tunnel/vni"),
        Some(TypedValue::Uint(2))
    );
    assert_eq!(pushed.deletes, vec![Path::from("/tunnel/gre-key")]);
}

#[test]
fn mandatory_satisfied_by_another_owner_passes() {
    let f = fixture();
    f.datastore
        .set_intent(&typed("other", 10, "/sys/hostname", "router1".into()))
        .unwrap();
    f.datastore
        .set_intent(&typed("a", 10, "/sys/location", "lab1".into()))
        .unwrap();

    let pushed = f.southbound.last();
    assert_eq!(
        update_value(&pushed, "/sys/location"),
        Some(TypedValue::String("lab1".to_string()))
    );
}

#[test]
fn mandatory_missing_everywhere_fails() {
    let f = fixture();
    let err = f
        .datastore
        .set_intent(&typed("a", 10, "/sys/location", "lab1".into()))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);
    assert!(err.to_string().contains("hostname"));
    // Nothing reached the device or the stores.
    assert_eq!(f.southbound.request_count(), 0);
    assert!(f.cache.intended_snapshot(DEVICE).is_empty());
}

#[test]
fn unresolved_leafref_fails_with_source_path() {
    let f = fixture();
    let err = f
        .datastore
        .set_intent(&typed("a", 10, "/mgmt/interface-name", "mgmt0".into()))
        .unwrap_err();
    assert!(matches!(err, DatastoreError::Validation(_)));
    assert!(err.to_string().contains("/mgmt/interface-name"));
    assert!(err.to_string().contains("mgmt0"));
}

#[test]
fn leafref_satisfied_within_the_same_intent() {
    let f = fixture();
    let request = SetIntentRequest {
        name: DEVICE.to_string(),
        intent: "a".to_string(),
        priority: 10,
        updates: vec![
            IntentUpdate {
                path: Path::from("/interface[name=mgmt0]/name"),
                value: "mgmt0".into(),
            },
            IntentUpdate {
                path: Path::from("/mgmt/interface-name"),
                value: "mgmt0".into(),
            },
        ],
        delete: false,
    };
    f.datastore.set_intent(&request).unwrap();
    let pushed = f.southbound.last();
    assert_eq!(
        update_value(&pushed, "/mgmt/interface-name"),
        Some(TypedValue::String("mgmt0".to_string()))
    );
}

#[test]
fn must_statement_gates_the_leaf() {
    let f = fixture();
    let err = f
        .datastore
        .set_intent(&typed("a", 10, "/qos/queues", TypedValue::Uint(4)))
        .unwrap_err();
    assert!(matches!(err, DatastoreError::Validation(_)));

    let request = SetIntentRequest {
        updates: vec![
            IntentUpdate {
                path: Path::from("/qos/enabled"),
                value: TypedValue::Bool(true),
            },
            IntentUpdate {
                path: Path::from("/qos/queues"),
                value: TypedValue::Uint(4),
            },
        ],
        ..typed("a", 10, "/qos/queues", TypedValue::Uint(4))
    };
    f.datastore.set_intent(&request).unwrap();
}

#[test]
fn southbound_failure_aborts_before_store_mutation() {
    let f = fixture();
    f.southbound.fail_next(SouthboundError::Unavailable {
        message: "connection refused".to_string(),
    });
    let err = f
        .datastore
        .set_intent(&typed("a", 10, "/interface[name=eth0]/mtu", TypedValue::Uint(1500)))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unavailable);

    assert!(f.cache.intended_snapshot(DEVICE).is_empty());
    assert!(f.cache.config_snapshot(DEVICE).is_empty());
    assert!(matches!(
        f.datastore.get_intent("a", 10),
        Err(DatastoreError::IntentNotFound { .. })
    ));
    // The staging candidate is discarded on failure too.
    assert_eq!(f.cache.candidate_count(DEVICE), 0);
}

#[test]
fn raw_intent_round_trips_and_lists() {
    let f = fixture();
    let request = typed("a", 10, "/interface[name=eth0]/mtu", TypedValue::Uint(1500));
    f.datastore.set_intent(&request).unwrap();
    f.datastore
        .set_intent(&typed("b", 5, "/sys/hostname", "router1".into()))
        .unwrap();

    let stored = f.datastore.get_intent("a", 10).unwrap();
    assert_eq!(stored, request);

    let listed = f.datastore.list_intent().unwrap();
    let pairs: Vec<(i32, &str)> = listed
        .iter()
        .map(|intent| (intent.priority, intent.intent.as_str()))
        .collect();
    assert_eq!(pairs, vec![(5, "b"), (10, "a")]);

    f.datastore.set_intent(&delete_intent("a", 10)).unwrap();
    assert!(matches!(
        f.datastore.get_intent("a", 10),
        Err(DatastoreError::IntentNotFound { .. })
    ));
    assert_eq!(f.datastore.list_intent().unwrap().len(), 1);
}

#[test]
fn config_store_receives_the_device_view() {
    let f = fixture();
    f.datastore
        .set_intent(&typed("a", 10, "/interface[name=eth0]/mtu", TypedValue::Uint(1500)))
        .unwrap();
    let config = f.cache.config_snapshot(DEVICE);
    let mtu = config
        .iter()
        .find(|u| u.path() == &Path::from("/interface/eth0/mtu"))
        .unwrap();
    assert_eq!(mtu.value().unwrap(), TypedValue::Uint(1500));
}

/// Southbound mock that parks inside the commit until released, so a
/// second transaction can observe the busy device.
struct BlockingTarget {
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl SouthboundTarget for BlockingTarget {
    fn set(&self, _candidate: &str, _request: &SetDataRequest) -> Result<(), SouthboundError> {
        self.started.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(())
    }
}

#[test]
fn concurrent_transaction_is_rejected_busy() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let cache = Arc::new(InMemoryCache::new());
    let datastore = Arc::new(Datastore::new(
        DEVICE,
        Arc::new(TestSchemaClient),
        cache,
        Arc::new(BlockingTarget {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        }),
    ));

    let background = {
        let datastore = datastore.clone();
        std::thread::spawn(move || {
            datastore.set_intent(&typed(
                "a",
                10,
                "/interface[name=eth0]/mtu",
                TypedValue::Uint(1500),
            ))
        })
    };
    started_rx.recv().unwrap();

    let err = datastore
        .set_intent(&typed("b", 5, "/sys/hostname", "router1".into()))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ResourceExhausted);

    release_tx.send(()).unwrap();
    background.join().unwrap().unwrap();
}
