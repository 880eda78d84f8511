// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};

use super::field::{LeafType, MustStatement};

/// Schema element for a leaf-list: a leaf holding an ordered set of values
/// of a single type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeafList {
    pub name: String,
    pub typ: LeafType,
}

impl LeafList {
    pub fn new(name: impl Into<String>, typ: LeafType) -> Self {
        Self {
            name: name.into(),
            typ,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn musts(&self) -> &[MustStatement] {
        &self.typ.musts
    }
}
