// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

pub mod container;
pub mod field;
pub mod leaf_list;

pub use self::container::{Choice, ChoiceCase, ChoiceInfo, Container};
pub use self::field::{Field, LeafKind, LeafType, MustStatement, Range, Ranges};
pub use self::leaf_list::LeafList;

use serde::{Deserialize, Serialize};

/// Macro to avoid repeating the match over [`SchemaElem`] just to call the
/// same accessor on each variant.
#[macro_export]
macro_rules! delegate_schema_elem_method {
    ($self:ident, $method:ident, $($arg:expr),*) => {
        match $self {
            Self::Container(elem) => elem.$method($($arg,)*),
            Self::Field(elem) => elem.$method($($arg,)*),
            Self::LeafList(elem) => elem.$method($($arg,)*),
        }
    };
}

/// Enum covering all schema element types.
///
/// Every code path that inspects a schema element goes through this
/// discriminator; `choice_info` only exists on containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::From)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaElem {
    Container(Container),
    Field(Field),
    #[serde(rename = "leaf-list")]
    LeafList(LeafList),
}

impl SchemaElem {
    /// The element name as declared in the schema.
    pub fn name(&self) -> &str {
        delegate_schema_elem_method!(self, name,)
    }

    /// The must-statements attached to this element, possibly empty.
    pub fn musts(&self) -> &[MustStatement] {
        delegate_schema_elem_method!(self, musts,)
    }

    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Self::Container(container) => Some(container),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Self::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Self::Container(_))
    }

    /// True for containers whose presence itself is configuration. Those are
    /// the only entries allowed to carry children and leaf variants at once.
    pub fn is_presence_container(&self) -> bool {
        matches!(self, Self::Container(container) if container.is_presence)
    }
}

impl From<&SchemaElem> for String {
    /// Get the element type as string, for diagnostics.
    fn from(value: &SchemaElem) -> Self {
        match value {
            SchemaElem::Container(_) => "container".to_string(),
            SchemaElem::Field(_) => "field".to_string(),
            SchemaElem::LeafList(_) => "leaf-list".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_tagging() {
        let elem = SchemaElem::Field(Field::new("mtu", LeafType::uint()));
        let json = serde_json::to_value(&elem).unwrap();
        assert_eq!(json["type"], "field");
        let back: SchemaElem = serde_json::from_value(json).unwrap();
        assert_eq!(back, elem);
    }

    #[test]
    fn presence_only_on_containers() {
        let field = SchemaElem::Field(Field::new("mtu", LeafType::uint()));
        assert!(!field.is_presence_container());

        let mut container = Container::new("tunnel");
        container.is_presence = true;
        assert!(SchemaElem::Container(container).is_presence_container());
    }
}
