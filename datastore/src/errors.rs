// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use intentd_cache::CacheError;
use intentd_schema::{Path, SchemaError};
use intentd_tree::{TreeError, ValidationResult};

use crate::southbound::SouthboundError;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::From)]
pub enum DatastoreError {
    /// Another intent transaction holds the device. Retryable.
    #[display("datastore {device} has an ongoing intent transaction")]
    Busy { device: String },
    #[display("intent {intent} with priority {priority} not found")]
    IntentNotFound { intent: String, priority: i32 },
    /// All violations of one validation pass, aggregated.
    #[display("cumulated validation errors:\n{_0}")]
    #[from]
    Validation(ValidationResult),
    /// A request update failed its precondition checks.
    #[display("invalid update for {path}: {message}")]
    InvalidUpdate { path: Path, message: String },
    #[display("malformed raw intent name '{name}'")]
    MalformedIntentName { name: String },
    #[from]
    Southbound(SouthboundError),
    #[from]
    Cache(CacheError),
    #[from]
    Tree(TreeError),
    #[from]
    Schema(SchemaError),
}

/// Transport-level classification of an error, as returned to RPC callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    ResourceExhausted,
    Unavailable,
    Internal,
}

impl DatastoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DatastoreError::Busy { .. } => ErrorCode::ResourceExhausted,
            DatastoreError::IntentNotFound { .. } => ErrorCode::NotFound,
            DatastoreError::Validation(_)
            | DatastoreError::InvalidUpdate { .. }
            | DatastoreError::MalformedIntentName { .. } => ErrorCode::InvalidArgument,
            DatastoreError::Southbound(_) => ErrorCode::Unavailable,
            DatastoreError::Cache(_) | DatastoreError::Tree(_) | DatastoreError::Schema(_) => {
                ErrorCode::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mapping() {
        let busy = DatastoreError::Busy {
            device: "dev1".to_string(),
        };
        assert_eq!(busy.code(), ErrorCode::ResourceExhausted);

        let not_found = DatastoreError::IntentNotFound {
            intent: "owner1".to_string(),
            priority: 10,
        };
        assert_eq!(not_found.code(), ErrorCode::NotFound);

        let southbound = DatastoreError::Southbound(SouthboundError::Unavailable {
            message: "connection refused".to_string(),
        });
        assert_eq!(southbound.code(), ErrorCode::Unavailable);
    }
}
