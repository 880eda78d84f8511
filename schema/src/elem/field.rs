// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::value::TypedValue;

/// Schema element for a single leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    pub name: String,
    pub typ: LeafType,
}

impl Field {
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

/// The type of a leaf, shared by fields and leaf-lists.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeafType {
    pub kind: LeafKind,
    /// Identity prefix, set when `kind` is `Identityref`. Rendered values
    /// take the form `prefix:value`.
    pub identity_prefix: Option<String>,
    /// Target path expression, set when `kind` is `Leafref`. Relative or
    /// absolute, may contain key references in bracket form.
    pub leafref: Option<String>,
    /// Permitted numeric ranges. Empty means the full range of the kind.
    #[serde(default, skip_serializing_if = "Ranges::is_empty")]
    pub ranges: Ranges,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub musts: Vec<MustStatement>,
}

impl LeafType {
    pub fn new(kind: LeafKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self::new(LeafKind::String)
    }

    pub fn uint() -> Self {
        Self::new(LeafKind::Uint)
    }

    pub fn int() -> Self {
        Self::new(LeafKind::Int)
    }

    pub fn boolean() -> Self {
        Self::new(LeafKind::Bool)
    }

    pub fn leafref(target: impl Into<String>) -> Self {
        Self {
            kind: LeafKind::Leafref,
            leafref: Some(target.into()),
            ..Default::default()
        }
    }

    pub fn identityref(prefix: impl Into<String>) -> Self {
        Self {
            kind: LeafKind::Identityref,
            identity_prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.ranges.add(min, max);
        self
    }

    pub fn with_must(mut self, expression: impl Into<String>) -> Self {
        self.musts.push(MustStatement {
            expression: expression.into(),
            error_message: None,
        });
        self
    }

    /// Check that a typed value matches this leaf type, including ranges.
    pub fn accepts(&self, value: &TypedValue) -> Result<(), TypeMismatch> {
        let ok = match (self.kind, value) {
            (LeafKind::Bool, TypedValue::Bool(_)) => true,
            (LeafKind::Int, TypedValue::Int(v)) => self.ranges.contains(*v),
            (LeafKind::Uint, TypedValue::Uint(v)) => {
                i64::try_from(*v).is_ok_and(|v| self.ranges.contains(v))
            }
            (LeafKind::String, TypedValue::String(_)) => true,
            (LeafKind::Binary, TypedValue::Bytes(_)) => true,
            (LeafKind::Identityref, TypedValue::Identity { .. }) => true,
            // Leafref values are typed like their target; the target type is
            // not known here, so any scalar is accepted.
            (LeafKind::Leafref, TypedValue::Json(_)) => false,
            (LeafKind::Leafref, TypedValue::Leaflist(_)) => false,
            (LeafKind::Leafref, _) => true,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(TypeMismatch {
                expected: self.kind,
                found: value.clone(),
            })
        }
    }
}

/// The scalar kinds a leaf can take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum LeafKind {
    Bool,
    Int,
    Uint,
    #[default]
    String,
    Binary,
    Identityref,
    Leafref,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display)]
#[display("value '{found}' does not match leaf type '{expected}'")]
pub struct TypeMismatch {
    pub expected: LeafKind,
    pub found: TypedValue,
}

/// An XPath predicate attached to a schema element; it must evaluate true
/// against the configuration for the configuration to be valid.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MustStatement {
    pub expression: String,
    pub error_message: Option<String>,
}

/// A collection of permitted integer ranges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ranges(Vec<Range>);

/// A single inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[display("{min}..{max}")]
pub struct Range {
    pub min: i64,
    pub max: i64,
}

impl Ranges {
    pub fn add(&mut self, min: i64, max: i64) {
        self.0.push(Range { min, max });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the value falls within any range, or no ranges are defined.
    pub fn contains(&self, value: i64) -> bool {
        if self.0.is_empty() {
            return true;
        }
        self.0
            .iter()
            .any(|range| range.min <= value && value <= range.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_empty_accepts_all() {
        let ranges = Ranges::default();
        assert!(ranges.contains(i64::MIN));
        assert!(ranges.contains(0));
        assert!(ranges.contains(i64::MAX));
    }

    #[test]
    fn ranges_multiple() {
        let mut ranges = Ranges::default();
        ranges.add(0, 10);
        ranges.add(100, 200);
        assert!(ranges.contains(5));
        assert!(ranges.contains(100));
        assert!(!ranges.contains(50));
        assert!(!ranges.contains(201));
    }

    #[test]
    fn accepts_matching_kind() {
        let typ = LeafType::uint().with_range(0, 9216);
        assert!(typ.accepts(&TypedValue::Uint(1500)).is_ok());
        assert!(typ.accepts(&TypedValue::Uint(10000)).is_err());
        assert!(typ.accepts(&TypedValue::from("1500")).is_err());
    }

    #[test]
    fn accepts_identityref() {
        let typ = LeafType::identityref("alg");
        assert!(typ
            .accepts(&TypedValue::Identity {
                prefix: "alg".to_string(),
                value: "des3".to_string(),
            })
            .is_ok());
        assert!(typ.accepts(&TypedValue::Bool(true)).is_err());
    }
}
