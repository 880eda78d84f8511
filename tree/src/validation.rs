// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

//! Schema-driven validation of a finalized tree.
//!
//! Violations do not short-circuit: the whole tree is walked and every
//! finding is accumulated, so one pass reports everything. Choice
//! exclusivity needs no check here; the resolver's skip set already hides
//! inactive cases from traversal.

use intentd_schema::{LeafKind, Path, SchemaElem, TypedValue};

use crate::entry::{EntryId, Tree, TreeError};
use crate::xpath;

/// One violation found during validation, tagged with the path it concerns.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
#[display("{violation}")]
pub struct Feedback {
    pub path: Path,
    pub violation: Violation,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum Violation {
    /// A mandatory child of a container instance is neither in the tree nor
    /// provided by another owner.
    #[display("{path}: mandatory child '{child}' does not exist")]
    MandatoryMissing { path: Path, child: String },
    /// A leafref value points at a path where no entry carries that value.
    #[display("{path}: leafref '{value}' does not resolve against {target}")]
    LeafrefUnresolved {
        path: Path,
        target: String,
        value: String,
    },
    /// A must-expression evaluated to false.
    #[display("{path}: must statement '{expression}' is not satisfied{message}")]
    MustFailed {
        path: Path,
        expression: String,
        message: MessageField,
    },
    /// A must-expression could not be parsed or evaluated.
    #[display("{path}: must statement '{expression}' failed evaluation: {error}")]
    MustError {
        path: Path,
        expression: String,
        error: String,
    },
}

/// Optional schema-provided error message, rendered with a leading
/// separator only when present.
#[derive(Debug, Clone, PartialEq, derive_more::From)]
pub struct MessageField(Option<String>);

impl std::fmt::Display for MessageField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(message) = &self.0 {
            write!(f, ": {message}")
        } else {
            Ok(())
        }
    }
}

/// All findings of one validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<Feedback>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn add(&mut self, path: Path, violation: Violation) {
        self.errors.push(Feedback { path, violation });
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.errors.iter().map(|f| f.to_string()).collect();
        f.write_str(&rendered.join("\n"))
    }
}

/// Validate the tree against its schema: mandatory children, leafref
/// resolution and must-expressions. Branches that are going away entirely
/// are skipped; removed configuration has nothing left to satisfy.
pub fn validate(tree: &mut Tree) -> Result<ValidationResult, TreeError> {
    let mut result = ValidationResult::default();
    validate_entry(tree, tree.root(), &mut result)?;
    Ok(result)
}

fn validate_entry(
    tree: &mut Tree,
    id: EntryId,
    result: &mut ValidationResult,
) -> Result<(), TreeError> {
    if tree.should_delete(id) {
        return Ok(());
    }

    match tree.schema(id).cloned() {
        Some(SchemaElem::Container(container)) => {
            for child in &container.mandatory_children {
                validate_mandatory_with_keys(tree, id, container.keys.len(), child, result);
            }
            for must in &container.musts {
                validate_must(tree, id, &must.expression, must.error_message.clone(), result);
            }
        }
        Some(SchemaElem::Field(field)) => {
            if field.typ.kind == LeafKind::Leafref {
                validate_leafref(tree, id, &field.typ.leafref.clone().unwrap_or_default(), result)?;
            }
            for must in field.musts() {
                validate_must(tree, id, &must.expression, must.error_message.clone(), result);
            }
        }
        Some(SchemaElem::LeafList(leaf_list)) => {
            for must in leaf_list.musts() {
                validate_must(tree, id, &must.expression, must.error_message.clone(), result);
            }
        }
        None => {}
    }

    // Structural walk: every child is visited regardless of choice state,
    // like should_delete and get_deletes. The active filter is reserved for
    // southbound-visible reads.
    for (_, child) in tree.children(id) {
        validate_entry(tree, child, result)?;
    }
    Ok(())
}

/// Check one mandatory child, descending through the key value levels of a
/// keyed container first so the check runs once per list instance.
fn validate_mandatory_with_keys(
    tree: &Tree,
    id: EntryId,
    level: usize,
    child: &str,
    result: &mut ValidationResult,
) {
    if level == 0 {
        let present = tree
            .active_child(id, child)
            .is_some_and(|found| !tree.should_delete(found));
        if !present {
            let path = tree.path(id);
            if !tree.context().path_exists(&path.join(child)) {
                result.add(
                    path.clone(),
                    Violation::MandatoryMissing {
                        path,
                        child: child.to_string(),
                    },
                );
            }
        }
        return;
    }

    for (_, instance) in tree.active_children(id) {
        if tree.should_delete(instance) {
            continue;
        }
        validate_mandatory_with_keys(tree, instance, level - 1, child, result);
    }
}

/// A leafref leaf must point at an existing entry carrying its value,
/// either in the tree (lazily loaded on demand) or in the store index.
fn validate_leafref(
    tree: &mut Tree,
    id: EntryId,
    target: &str,
    result: &mut ValidationResult,
) -> Result<(), TreeError> {
    let Some(variant) = tree.node(id).leaf_variants.get_highest_precedence(false) else {
        return Ok(());
    };
    let value = variant.update.value()?;
    let rendered = value.render();

    let candidates = xpath::navigate_leafref(tree, id)?;
    for candidate in candidates {
        if let Some(found) = tree.node(candidate).leaf_variants.get_highest_precedence(false) {
            if found.update.value()?.render() == rendered {
                return Ok(());
            }
        }
    }

    // Not in the tree; the target may still exist under another owner in
    // the store index, or as a not-yet-loaded running leaf.
    for path in leafref_fallback_paths(tree, id, target, &value) {
        if tree.context().path_exists(&path) {
            return Ok(());
        }
        if let Some(update) = tree.context().read_running(&path)? {
            if update.value()?.render() == rendered {
                return Ok(());
            }
        }
    }

    let path = tree.path(id);
    result.add(
        path.clone(),
        Violation::LeafrefUnresolved {
            path,
            target: target.to_string(),
            value: rendered,
        },
    );
    Ok(())
}

/// Concrete data paths where the leafref target could live. For a target
/// naming the key leaf of a keyed container, the source value is the key,
/// so the instance path can be constructed directly.
fn leafref_fallback_paths(tree: &Tree, id: EntryId, target: &str, value: &TypedValue) -> Vec<Path> {
    let (absolute, steps) = xpath::parse_leafref(target);
    let mut segments: Vec<String> = if absolute {
        Vec::new()
    } else {
        tree.path(id).into()
    };
    for step in steps {
        match step.as_str() {
            "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name.to_string()),
        }
    }
    let Some((leaf, parent)) = segments.split_last() else {
        return Vec::new();
    };

    let mut paths = Vec::new();
    if let Ok(SchemaElem::Container(container)) =
        tree.context().get_schema(&Path::from(parent.to_vec()))
    {
        if container.keys.iter().any(|key| key == leaf) {
            let mut keyed = parent.to_vec();
            keyed.push(value.render());
            keyed.push(leaf.clone());
            paths.push(Path::from(keyed));
        }
    }
    paths.push(Path::from(segments));
    paths
}

/// Evaluate one must-expression with the entry as context node. A false
/// result and an evaluation failure both count as violations; all findings
/// accumulate.
fn validate_must(
    tree: &mut Tree,
    id: EntryId,
    expression: &str,
    message: Option<String>,
    result: &mut ValidationResult,
) {
    let path = tree.path(id);
    let parsed = match xpath::parse(expression) {
        Ok(parsed) => parsed,
        Err(err) => {
            result.add(
                path.clone(),
                Violation::MustError {
                    path,
                    expression: expression.to_string(),
                    error: err.to_string(),
                },
            );
            return;
        }
    };
    match xpath::eval(tree, id, &parsed) {
        Ok(datum) if datum.truthy() => {}
        Ok(_) => {
            result.add(
                path.clone(),
                Violation::MustFailed {
                    path,
                    expression: expression.to_string(),
                    message: message.into(),
                },
            );
        }
        Err(err) => {
            result.add(
                path.clone(),
                Violation::MustError {
                    path,
                    expression: expression.to_string(),
                    error: err.to_string(),
                },
            );
        }
    }
}
