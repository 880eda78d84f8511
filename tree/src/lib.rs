// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.
#![deny(unused_crate_dependencies)]

//! The per-device merge core: a schema-shaped, priority-ordered, multi-owner
//! configuration tree.
//!
//! A [`Tree`] lives for exactly one intent transaction. It is populated from
//! the intended store and the incoming request, finalized (choice/case
//! arbitration), queried for southbound deltas and validated, then dropped.
//! Entries are arena-allocated inside the tree and addressed by [`EntryId`];
//! parents structurally outlive their children.

mod choice;
mod context;
mod delta;
mod entry;
mod leaf;
pub mod validation;
pub mod xpath;

pub use self::choice::{ChoiceResolver, ChoiceResolvers};
pub use self::context::{PathSet, TreeContext};
pub use self::entry::{EntryId, Tree, TreeError};
pub use self::leaf::{LeafVariant, LeafVariants, RUNNING_OWNER};
pub use self::validation::{Feedback, ValidationResult, Violation};

#[cfg(test)]
use intentd_testutil as _;
