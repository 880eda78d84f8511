// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use intentd_schema::{Path, TypedValue};

/// One decoded update pushed towards the device.
#[derive(Debug, Clone, PartialEq)]
pub struct SouthboundUpdate {
    pub path: Path,
    pub value: TypedValue,
}

/// A single batch of writes and deletes applied to a device in one commit.
/// The driver owns edit-config/commit atomicity; on commit failure all
/// pending changes are discarded on the device.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetDataRequest {
    pub updates: Vec<SouthboundUpdate>,
    pub deletes: Vec<Path>,
}

impl SetDataRequest {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// The southbound driver of one device, e.g. a NETCONF session. Sessions
/// are per-device; reconnect handling lives inside the driver.
pub trait SouthboundTarget: Send + Sync {
    /// Stage the request into the named device candidate and commit it.
    fn set(&self, candidate: &str, request: &SetDataRequest) -> Result<(), SouthboundError>;
}

#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum SouthboundError {
    #[display("device not reachable: {message}")]
    Unavailable { message: String },
    #[display("commit failed, pending changes discarded: {message}")]
    CommitFailed { message: String },
}
