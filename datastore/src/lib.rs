// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.
#![deny(unused_crate_dependencies)]

//! The per-device intent transaction orchestrator.
//!
//! A [`Datastore`] owns one managed device: it serializes `set_intent`
//! transactions behind a single-flight lock, stages them in a cache
//! candidate, drives the merge tree, pushes the resulting deltas to the
//! southbound driver and persists the owner-scoped outcome.

mod datastore;
mod errors;
mod expand;
mod intent;
mod southbound;

pub use self::datastore::Datastore;
pub use self::errors::{DatastoreError, ErrorCode};
pub use self::intent::{IntentUpdate, ListedIntent, SetIntentRequest, raw_intent_name};
pub use self::southbound::{SetDataRequest, SouthboundError, SouthboundTarget, SouthboundUpdate};
