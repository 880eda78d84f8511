// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};

/// A schema-typed leaf value.
///
/// Comparisons and coercions dispatch on the tag. Identityrefs carry the
/// schema-provided prefix and render as `prefix:value`, matching the
/// identity names used in must-expressions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(String),
    Bytes(Vec<u8>),
    Identity {
        prefix: String,
        value: String,
    },
    /// Leaf-list payload, one entry per list member.
    Leaflist(Vec<TypedValue>),
    /// An unexpanded JSON document. Only valid on ingestion; expansion turns
    /// it into typed leaf updates before anything reaches the tree.
    Json(serde_json::Value),
}

impl TypedValue {
    /// Serialize for cache storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from cache storage.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// The value as a string, the way it appears in XPath comparisons.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypedValue::Bool(v) => write!(f, "{v}"),
            TypedValue::Int(v) => write!(f, "{v}"),
            TypedValue::Uint(v) => write!(f, "{v}"),
            TypedValue::String(v) => f.write_str(v),
            TypedValue::Bytes(v) => write!(f, "{v:02x?}"),
            TypedValue::Identity { prefix, value } => write!(f, "{prefix}:{value}"),
            TypedValue::Leaflist(items) => {
                let rendered: Vec<String> = items.iter().map(|item| item.to_string()).collect();
                write!(f, "[{}]", rendered.join(","))
            }
            TypedValue::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip() {
        let values = [
            TypedValue::Bool(true),
            TypedValue::Int(-42),
            TypedValue::Uint(9000),
            TypedValue::from("eth0"),
            TypedValue::Bytes(vec![0xde, 0xad]),
            TypedValue::Identity {
                prefix: "alg".to_string(),
                value: "des3".to_string(),
            },
            TypedValue::Leaflist(vec![TypedValue::from("a"), TypedValue::from("b")]),
        ];
        for value in values {
            let bytes = value.to_bytes().unwrap();
            assert_eq!(TypedValue::from_bytes(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn identity_renders_with_prefix() {
        let value = TypedValue::Identity {
            prefix: "alg".to_string(),
            value: "des3".to_string(),
        };
        assert_eq!(value.render(), "alg:des3");
    }

    #[test]
    fn display_scalars() {
        assert_eq!(TypedValue::Uint(1500).to_string(), "1500");
        assert_eq!(TypedValue::from("mgmt0").to_string(), "mgmt0");
        assert_eq!(TypedValue::Bool(false).to_string(), "false");
    }
}
