// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use ordermap::OrderMap;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::field::MustStatement;

/// Schema element for a container, including keyed list containers.
///
/// A keyed container owns one tree level per key below each instance name;
/// those key levels have no schema element of their own and inherit their
/// semantics from this container.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Container {
    pub name: String,
    /// Key leaf names in schema order. Empty for plain containers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    /// Child names that must be present in every instance of this container.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mandatory_children: Vec<String>,
    pub choice_info: Option<ChoiceInfo>,
    /// Presence containers may carry a direct "is present" leaf variant in
    /// addition to children.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_presence: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub musts: Vec<MustStatement>,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn musts(&self) -> &[MustStatement] {
        &self.musts
    }
}

/// The choices declared on a container, by choice name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceInfo {
    pub choices: OrderMap<String, Choice>,
}

/// One choice: a set of mutually exclusive cases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Choice {
    pub cases: OrderMap<String, ChoiceCase>,
}

/// One case of a choice and the child element names belonging to it.
/// An element name belongs to exactly one case of one choice per container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceCase {
    pub elements: Vec<String>,
}

impl ChoiceInfo {
    pub fn builder() -> ChoiceInfoBuilder {
        ChoiceInfoBuilder::default()
    }
}

/// Convenience builder used by schema providers and test fixtures.
#[derive(Debug, Default)]
pub struct ChoiceInfoBuilder {
    choices: OrderMap<String, Choice>,
}

impl ChoiceInfoBuilder {
    pub fn case(
        mut self,
        choice: impl Into<String>,
        case: impl Into<String>,
        elements: &[&str],
    ) -> Self {
        self.choices
            .entry(choice.into())
            .or_default()
            .cases
            .insert(
                case.into(),
                ChoiceCase {
                    elements: elements.iter().map(|e| e.to_string()).collect(),
                },
            );
        self
    }

    pub fn build(self) -> ChoiceInfo {
        ChoiceInfo {
            choices: self.choices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_builder() {
        let info = ChoiceInfo::builder()
            .case("encap", "gre", &["gre-key"])
            .case("encap", "vxlan", &["vni"])
            .build();
        let encap = &info.choices["encap"];
        assert_eq!(encap.cases.len(), 2);
        assert_eq!(encap.cases["vxlan"].elements, ["vni"]);
    }

    #[test]
    fn plain_container_has_no_keys() {
        let container = Container::new("sys");
        assert!(container.keys.is_empty());
        assert!(container.choice_info.is_none());
        assert!(!container.is_presence);
    }
}
