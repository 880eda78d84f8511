// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use ordermap::OrderMap;

use intentd_schema::ChoiceInfo;

/// Per-container arbitration state for every choice the schema declares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceResolvers(OrderMap<String, ChoiceResolver>);

impl ChoiceResolvers {
    pub fn from_info(info: &ChoiceInfo) -> Self {
        let mut resolvers = OrderMap::new();
        for (choice_name, choice) in &info.choices {
            let mut resolver = ChoiceResolver::default();
            for (case_name, case) in &choice.cases {
                resolver.add_case(case_name, &case.elements);
            }
            resolvers.insert(choice_name.clone(), resolver);
        }
        Self(resolvers)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ChoiceResolver)> {
        self.0.iter()
    }

    /// Every element name governed by any choice of this container.
    pub fn element_names(&self) -> Vec<String> {
        self.0
            .values()
            .flat_map(ChoiceResolver::element_names)
            .collect()
    }

    /// Feed a branch precedence value for an element into its resolver.
    pub fn set_value(&mut self, element: &str, priority: i32, new: bool) {
        for resolver in self.0.values_mut() {
            resolver.set_value(element, priority, new);
        }
    }

    /// True when the element belongs to a case other than the resolved best
    /// case of its choice; such children are hidden from active traversal.
    pub fn is_skipped(&self, element: &str) -> bool {
        self.0.values().any(|resolver| resolver.is_skipped(element))
    }

    /// The union of element names from all cases other than each choice's
    /// best case.
    pub fn skip_elements(&self) -> Vec<String> {
        let mut skipped = Vec::new();
        for resolver in self.0.values() {
            let best = resolver.best_case();
            for (case_name, case) in &resolver.cases {
                if Some(case_name.as_str()) != best {
                    skipped.extend(case.elements.iter().cloned());
                }
            }
        }
        skipped
    }
}

/// Arbitration state of a single choice.
///
/// Each case tracks two precedence values: the strongest found in the
/// intended store before this transaction, excluding the active owner
/// (`old`), and the strongest currently in the tree (`new`). The best case
/// is the one with the overall strongest value; the old-best case uses the
/// stored values alone and marks what the device currently carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceResolver {
    cases: OrderMap<String, CaseState>,
}

#[derive(Debug, Clone, PartialEq)]
struct CaseState {
    elements: Vec<String>,
    old: i32,
    new: i32,
}

impl ChoiceResolver {
    pub fn add_case(&mut self, name: &str, elements: &[String]) {
        self.cases.insert(
            name.to_string(),
            CaseState {
                elements: elements.to_vec(),
                old: i32::MAX,
                new: i32::MAX,
            },
        );
    }

    pub fn element_names(&self) -> Vec<String> {
        self.cases
            .values()
            .flat_map(|case| case.elements.iter().cloned())
            .collect()
    }

    pub fn case_elements(&self, case: &str) -> &[String] {
        self.cases
            .get(case)
            .map(|state| state.elements.as_slice())
            .unwrap_or_default()
    }

    pub fn set_value(&mut self, element: &str, priority: i32, new: bool) {
        for case in self.cases.values_mut() {
            if case.elements.iter().any(|elem| elem == element) {
                if new {
                    case.new = case.new.min(priority);
                } else {
                    case.old = case.old.min(priority);
                }
            }
        }
    }

    /// The case with the overall strongest precedence, `None` when no case
    /// carries a value. Ties resolve to schema declaration order.
    pub fn best_case(&self) -> Option<&str> {
        self.cases
            .iter()
            .map(|(name, case)| (name, case.old.min(case.new)))
            .filter(|(_, priority)| *priority < i32::MAX)
            .min_by_key(|(_, priority)| *priority)
            .map(|(name, _)| name.as_str())
    }

    /// The case that was active before this transaction, judged by stored
    /// values alone.
    pub fn old_best_case(&self) -> Option<&str> {
        self.cases
            .iter()
            .filter(|(_, case)| case.old < i32::MAX)
            .min_by_key(|(_, case)| case.old)
            .map(|(name, _)| name.as_str())
    }

    fn is_skipped(&self, element: &str) -> bool {
        let Some(best) = self.best_case() else {
            // An unresolved choice hides nothing.
            return false;
        };
        self.cases
            .iter()
            .filter(|(name, _)| name.as_str() != best)
            .any(|(_, case)| case.elements.iter().any(|elem| elem == element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentd_schema::ChoiceInfo;

    fn resolver() -> ChoiceResolvers {
        let info = ChoiceInfo::builder()
            .case("encap", "gre", &["gre-key"])
            .case("encap", "vxlan", &["vni"])
            .build();
        ChoiceResolvers::from_info(&info)
    }

    #[test]
    fn unresolved_choice_hides_nothing() {
        let resolvers = resolver();
        assert!(!resolvers.is_skipped("gre-key"));
        assert!(!resolvers.is_skipped("vni"));
        assert!(resolvers.skip_elements().is_empty());
    }

    #[test]
    fn strongest_branch_wins() {
        let mut resolvers = resolver();
        resolvers.set_value("gre-key", 10, false);
        resolvers.set_value("vni", 5, true);
        let (_, encap) = resolvers.iter().next().unwrap();
        assert_eq!(encap.best_case(), Some("vxlan"));
        assert_eq!(encap.old_best_case(), Some("gre"));
        assert!(resolvers.is_skipped("gre-key"));
        assert!(!resolvers.is_skipped("vni"));
    }

    #[test]
    fn old_value_alone_resolves_case() {
        let mut resolvers = resolver();
        resolvers.set_value("gre-key", 10, false);
        let (_, encap) = resolvers.iter().next().unwrap();
        assert_eq!(encap.best_case(), Some("gre"));
        assert_eq!(encap.old_best_case(), Some("gre"));
        assert_eq!(resolvers.skip_elements(), ["vni"]);
    }

    #[test]
    fn tie_resolves_to_declaration_order() {
        let mut resolvers = resolver();
        resolvers.set_value("gre-key", 7, true);
        resolvers.set_value("vni", 7, true);
        let (_, encap) = resolvers.iter().next().unwrap();
        assert_eq!(encap.best_case(), Some("gre"));
    }
}
