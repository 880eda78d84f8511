// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use log::debug;
use ordermap::OrderMap;

use intentd_cache::{CacheError, Update, UpdateValueError};
use intentd_schema::{Path, SchemaElem, SchemaError};

use crate::choice::ChoiceResolvers;
use crate::context::TreeContext;
use crate::leaf::LeafVariants;
use crate::xpath::XpathError;

/// Handle to one entry of a [`Tree`]. Entries are arena-allocated and never
/// removed, so a handle stays valid for the lifetime of its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// One node of the configuration tree.
///
/// `children` and `leaf_variants` are mutually exclusive except on presence
/// containers. `schema` is absent on the key value levels of keyed
/// containers; those levels inherit semantics from the nearest ancestor
/// carrying a schema.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) name: String,
    pub(crate) parent: Option<EntryId>,
    pub(crate) children: OrderMap<String, EntryId>,
    pub(crate) leaf_variants: LeafVariants,
    pub(crate) schema: Option<SchemaElem>,
    pub(crate) choices: ChoiceResolvers,
}

/// The configuration tree of one intent transaction.
pub struct Tree {
    nodes: Vec<Entry>,
    context: TreeContext,
}

impl Tree {
    /// Construct a tree holding only the root entry. The root carries the
    /// schema element served for the empty path, so constraints declared at
    /// the top level participate in validation like everywhere else.
    pub fn new(context: TreeContext) -> Result<Self, TreeError> {
        let schema = context.get_schema(&Path::root())?;
        let choices = schema
            .as_container()
            .and_then(|container| container.choice_info.as_ref())
            .map(ChoiceResolvers::from_info)
            .unwrap_or_default();
        let root = Entry {
            name: String::new(),
            parent: None,
            children: OrderMap::new(),
            leaf_variants: LeafVariants::default(),
            schema: Some(schema),
            choices,
        };
        Ok(Self {
            nodes: vec![root],
            context,
        })
    }

    pub fn root(&self) -> EntryId {
        EntryId(0)
    }

    pub fn context(&self) -> &TreeContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut TreeContext {
        &mut self.context
    }

    pub(crate) fn node(&self, id: EntryId) -> &Entry {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: EntryId) -> &mut Entry {
        &mut self.nodes[id.0]
    }

    /// The absolute path of an entry.
    pub fn path(&self, id: EntryId) -> Path {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.parent.is_some() {
                segments.push(node.name.clone());
            }
            current = node.parent;
        }
        segments.reverse();
        Path::from(segments)
    }

    pub fn schema(&self, id: EntryId) -> Option<&SchemaElem> {
        self.node(id).schema.as_ref()
    }

    pub fn parent(&self, id: EntryId) -> Option<EntryId> {
        self.node(id).parent
    }

    /// The nearest ancestor of `id` that carries a schema, together with the
    /// number of levels between them. `None` on the root itself.
    pub fn ancestor_schema(&self, id: EntryId) -> Option<(EntryId, usize)> {
        let mut levels = 0;
        let mut current = self.node(id).parent;
        while let Some(node_id) = current {
            levels += 1;
            if self.node(node_id).schema.is_some() {
                return Some((node_id, levels));
            }
            current = self.node(node_id).parent;
        }
        None
    }

    /// The nearest entry at or above `id` carrying a schema. Used when
    /// navigation must rise out of key value levels transparently.
    pub fn first_with_schema(&self, id: EntryId) -> EntryId {
        let mut current = id;
        while self.node(current).schema.is_none() {
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
        current
    }

    /// Add a cache update to the tree, creating all entries along its path.
    ///
    /// `is_new` marks updates originating from the incoming request rather
    /// than from stored state.
    pub fn add_update(&mut self, update: &Update, is_new: bool) -> Result<(), TreeError> {
        let segments: Vec<String> = update.path().segments().to_vec();
        let mut current = self.root();
        for segment in &segments {
            current = match self.node(current).children.get(segment) {
                Some(&child) => child,
                None => self.create_child(current, segment)?,
            };
        }
        self.node_mut(current).leaf_variants.add(update, is_new);
        Ok(())
    }

    /// Create a child entry under `parent`.
    ///
    /// The schema is fetched unless the new entry sits on a key value level:
    /// the nearest ancestor schema is a keyed container and the distance to
    /// it does not exceed its key count.
    fn create_child(&mut self, parent: EntryId, name: &str) -> Result<EntryId, TreeError> {
        let parent_node = self.node(parent);
        if !parent_node.leaf_variants.is_empty()
            && !parent_node
                .schema
                .as_ref()
                .is_some_and(SchemaElem::is_presence_container)
        {
            return Err(TreeError::PresenceViolation {
                parent: self.path(parent),
                child: name.to_string(),
            });
        }

        let path = self.path(parent).join(name);
        let fetch_schema = match self.nearest_schema_at_or_above(parent) {
            Some((ancestor, distance)) => {
                let level_up = distance + 1;
                match self.node(ancestor).schema.as_ref() {
                    Some(SchemaElem::Container(container)) => container.keys.len() < level_up,
                    _ => true,
                }
            }
            None => true,
        };

        let schema = if fetch_schema {
            Some(self.context.get_schema(&path)?)
        } else {
            None
        };
        let choices = schema
            .as_ref()
            .and_then(SchemaElem::as_container)
            .and_then(|container| container.choice_info.as_ref())
            .map(ChoiceResolvers::from_info)
            .unwrap_or_default();

        let id = EntryId(self.nodes.len());
        self.nodes.push(Entry {
            name: name.to_string(),
            parent: Some(parent),
            children: OrderMap::new(),
            leaf_variants: LeafVariants::default(),
            schema,
            choices,
        });
        self.node_mut(parent).children.insert(name.to_string(), id);
        Ok(id)
    }

    fn nearest_schema_at_or_above(&self, id: EntryId) -> Option<(EntryId, usize)> {
        if self.node(id).schema.is_some() {
            return Some((id, 0));
        }
        self.ancestor_schema(id)
    }

    /// Look up a child by name, honoring the choice/case skip set. Entries
    /// without a schema (key levels) expose all children.
    pub fn active_child(&self, id: EntryId, name: &str) -> Option<EntryId> {
        let node = self.node(id);
        if node.schema.is_some() && node.choices.is_skipped(name) {
            return None;
        }
        node.children.get(name).copied()
    }

    /// The children visible to active traversal: all of them, minus the
    /// elements of non-best choice cases.
    pub fn active_children(&self, id: EntryId) -> Vec<(String, EntryId)> {
        let node = self.node(id);
        node.children
            .iter()
            .filter(|(name, _)| node.schema.is_none() || !node.choices.is_skipped(name))
            .map(|(name, &child)| (name.clone(), child))
            .collect()
    }

    pub fn children(&self, id: EntryId) -> Vec<(String, EntryId)> {
        self.node(id)
            .children
            .iter()
            .map(|(name, &child)| (name.clone(), child))
            .collect()
    }

    /// Resolve a path relative to `from`.
    ///
    /// `.` stays, `..` ascends, a leading `/` restarts from the root. Missing
    /// children are lazily loaded from the running configuration before
    /// giving up.
    pub fn navigate(&mut self, from: EntryId, segments: &[String]) -> Result<EntryId, TreeError> {
        let mut current = from;
        for (idx, segment) in segments.iter().enumerate() {
            match segment.as_str() {
                "." => {}
                ".." => {
                    current = self.parent(current).ok_or_else(|| TreeError::AscendFromRoot {
                        path: self.path(current),
                    })?;
                }
                "/" if idx == 0 => current = self.root(),
                name => {
                    current = match self.active_child(current, name) {
                        Some(child) => child,
                        None => self.try_loading(current, &segments[idx..])?,
                    };
                }
            }
        }
        Ok(current)
    }

    /// Attempt to load a missing branch from the running configuration and
    /// return the newly inserted child.
    fn try_loading(&mut self, at: EntryId, remaining: &[String]) -> Result<EntryId, TreeError> {
        let mut full = self.path(at);
        for segment in remaining {
            full.push(segment.clone());
        }
        let update = self
            .context
            .read_running(&full)?
            .ok_or_else(|| TreeError::NotFound {
                reached: self.path(at),
                segment: remaining[0].clone(),
            })?;
        debug!("lazily loaded {} from the running configuration", full);
        self.add_update(&update, false)?;
        self.node(at)
            .children
            .get(&remaining[0])
            .copied()
            .ok_or_else(|| TreeError::NotFound {
                reached: self.path(at),
                segment: remaining[0].clone(),
            })
    }

    /// Flag every leaf variant of the given owner for deletion. Re-asserted
    /// values clear the flag again during insertion.
    pub fn mark_owner_delete(&mut self, owner: &str) {
        for node in &mut self.nodes {
            if let Some(variant) = node.leaf_variants.get_by_owner_mut(owner) {
                variant.mark_delete();
            }
        }
    }

    /// True when nothing under this entry justifies keeping it: its variants
    /// report deletable, or all children do.
    pub fn should_delete(&self, id: EntryId) -> bool {
        let node = self.node(id);
        if !node.leaf_variants.is_empty() {
            return node.leaf_variants.should_delete();
        }
        node.children
            .values()
            .all(|&child| self.should_delete(child))
    }

    /// End of the insertion phase: resolve the active choice case per
    /// container from the stored and in-tree precedence values. Traversal
    /// below a container already honors the cases resolved above it.
    pub fn finish_insertion_phase(&mut self) {
        self.finish_node(self.root());
    }

    fn finish_node(&mut self, id: EntryId) {
        self.populate_choice_resolvers(id);
        for (_, child) in self.active_children(id) {
            self.finish_node(child);
        }
    }

    fn populate_choice_resolvers(&mut self, id: EntryId) {
        if self.node(id).schema.is_none() || self.node(id).choices.is_empty() {
            return;
        }
        let base = self.path(id);
        let owner = self.context.owner().to_string();
        let mut feeds = Vec::new();
        for element in self.node(id).choices.element_names() {
            let old = self
                .context
                .branch_highest_precedence(&base.join(element.clone()), Some(&owner));
            let new = self
                .node(id)
                .children
                .get(&element)
                .map(|&child| self.highest_precedence_of_branch(child));
            feeds.push((element, old, new));
        }
        let node = self.node_mut(id);
        for (element, old, new) in feeds {
            if old < i32::MAX {
                node.choices.set_value(&element, old, false);
            }
            if let Some(new) = new {
                node.choices.set_value(&element, new, true);
            }
        }
    }

    /// The strongest (lowest) priority carried anywhere in the branch rooted
    /// here, `i32::MAX` when the branch carries nothing.
    pub fn highest_precedence_of_branch(&self, id: EntryId) -> i32 {
        let node = self.node(id);
        let mut result = node.leaf_variants.highest_precedence_value();
        for &child in node.children.values() {
            result = result.min(self.highest_precedence_of_branch(child));
        }
        result
    }

    fn render_indent(&self, id: EntryId, depth: usize, out: &mut Vec<String>) {
        let node = self.node(id);
        out.push(format!("{}{}", "  ".repeat(depth), node.name));
        for &child in node.children.values() {
            self.render_indent(child, depth + 1, out);
        }
        for variant in &node.leaf_variants {
            out.push(format!("{} -> {}", "  ".repeat(depth), variant));
        }
    }
}

/// Indented rendering of the whole tree, for debug logging.
impl std::fmt::Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut lines = Vec::new();
        self.render_indent(self.root(), 0, &mut lines);
        f.write_str(&lines.join("\n"))
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::From)]
pub enum TreeError {
    #[from]
    Schema(SchemaError),
    #[from]
    Cache(CacheError),
    #[from]
    Value(UpdateValueError),
    #[from]
    Xpath(XpathError),
    /// Children under an entry that holds leaf values, outside a presence
    /// container.
    #[display("cannot add child {child} to {parent} since it holds leaf values")]
    PresenceViolation { parent: Path, child: String },
    #[display("navigating tree, reached {reached} but child {segment} does not exist")]
    NotFound { reached: Path, segment: String },
    #[display("cannot ascend above the root from {path}")]
    AscendFromRoot { path: Path },
}
