// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.
#![deny(unused_crate_dependencies)]

//! Schema element model for the intent merge engine.
//!
//! A device schema is served element by element: [`SchemaElem`] is the tagged
//! variant over containers, leaf fields and leaf-lists. The [`SchemaClient`]
//! trait is the seam towards the schema service; [`SchemaCache`] sits in
//! front of it, translating data paths (which contain list key values) into
//! keyless schema paths and memoizing the results.

pub mod cache;
pub mod client;
pub mod elem;
pub mod path;
pub mod value;

pub use self::cache::SchemaCache;
pub use self::client::{SchemaClient, SchemaError};
pub use self::elem::{
    Choice, ChoiceCase, ChoiceInfo, Container, Field, LeafKind, LeafList, LeafType, MustStatement,
    Range, Ranges, SchemaElem,
};
pub use self::path::Path;
pub use self::value::TypedValue;
