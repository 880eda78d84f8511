// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use crate::elem::SchemaElem;
use crate::path::Path;

/// Client towards the schema service.
///
/// Paths handed to implementations are *keyless*: list key levels have
/// already been stripped by [`crate::SchemaCache`], so every segment names a
/// schema element. Implementations are expected to be safe for concurrent
/// use; per-device transactions never share a cache instance.
pub trait SchemaClient: Send + Sync {
    /// Fetch the schema element at the given keyless path.
    fn get_schema(&self, path: &Path) -> Result<SchemaElem, SchemaError>;

    /// Yield one schema element per path segment, root-down. Used for
    /// path-walk validation of incoming updates.
    fn get_schema_elements(&self, path: &Path) -> Result<Vec<SchemaElem>, SchemaError> {
        let mut elems = Vec::with_capacity(path.len());
        let mut walked = Path::root();
        for segment in path.segments() {
            walked.push(segment.clone());
            elems.push(self.get_schema(&walked)?);
        }
        Ok(elems)
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum SchemaError {
    /// The path does not name a schema element.
    #[display("no schema element at {path}")]
    NotFound { path: Path },
    /// A path descends below a leaf element.
    #[display("cannot descend into leaf {path} towards {segment}")]
    DescendIntoLeaf { path: Path, segment: String },
    /// The schema service is unreachable or misbehaving.
    #[display("schema service failure: {message}")]
    Service { message: String },
}
