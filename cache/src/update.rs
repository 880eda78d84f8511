// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};

use intentd_schema::{Path, TypedValue};

/// One cache record: an owner's value claim on a path at a priority.
///
/// The value is carried as serialized bytes and only decoded on demand.
/// Key listings yield updates without a value. Equality ignores the
/// timestamp.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Update {
    path: Path,
    value: Option<Vec<u8>>,
    priority: i32,
    owner: String,
    timestamp: u64,
}

impl Update {
    pub fn new(
        path: Path,
        value: TypedValue,
        priority: i32,
        owner: impl Into<String>,
        timestamp: u64,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            path,
            value: Some(value.to_bytes()?),
            priority,
            owner: owner.into(),
            timestamp,
        })
    }

    /// A value-less update, as returned by key listings.
    pub fn key_only(path: Path, priority: i32, owner: impl Into<String>) -> Self {
        Self {
            path,
            value: None,
            priority,
            owner: owner.into(),
            timestamp: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn raw_value(&self) -> Option<&[u8]> {
        self.value.as_deref()
    }

    /// Decode the typed value carried by this update.
    pub fn value(&self) -> Result<TypedValue, UpdateValueError> {
        let bytes = self.value.as_deref().ok_or(UpdateValueError::KeyOnly {
            path: self.path.clone(),
        })?;
        TypedValue::from_bytes(bytes).map_err(|err| UpdateValueError::Decode {
            path: self.path.clone(),
            message: err.to_string(),
        })
    }

    /// Equality that ignores the path, used when re-inserting an owner's
    /// unchanged leaf to detect a no-op.
    pub fn equal_skip_path(&self, other: &Update) -> bool {
        self.value == other.value && self.priority == other.priority && self.owner == other.owner
    }
}

impl PartialEq for Update {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.equal_skip_path(other)
    }
}

impl std::fmt::Display for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered = match self.value() {
            Ok(value) => value.to_string(),
            Err(_) => "<none>".to_string(),
        };
        write!(
            f,
            "{} = {} (owner {}, priority {})",
            self.path, rendered, self.owner, self.priority
        )
    }
}

pub type UpdateSlice = Vec<Update>;

#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum UpdateValueError {
    #[display("update for {path} carries no value")]
    KeyOnly { path: Path },
    #[display("failed decoding value at {path}: {message}")]
    Decode { path: Path, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(ts: u64) -> Update {
        Update::new(
            Path::from("/interface/eth0/mtu"),
            TypedValue::Uint(1500),
            10,
            "owner1",
            ts,
        )
        .unwrap()
    }

    #[test]
    fn equality_ignores_timestamp() {
        assert_eq!(update(1), update(2));
    }

    #[test]
    fn value_round_trip() {
        assert_eq!(update(0).value().unwrap(), TypedValue::Uint(1500));
    }

    #[test]
    fn key_only_has_no_value() {
        let upd = Update::key_only(Path::from("/sys/hostname"), 5, "owner2");
        assert!(matches!(
            upd.value().unwrap_err(),
            UpdateValueError::KeyOnly { .. }
        ));
    }
}
