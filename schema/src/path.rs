// Copyright (c) 2025 Arista Networks, Inc.
// Use of this source code is governed by the Apache License 2.0
// that can be found in the LICENSE file.

use serde::{Deserialize, Serialize};

/// An absolute data path, one string per tree level.
///
/// List key values occupy their own level, so `/interface[name=eth0]/mtu`
/// is the three segments `["interface", "eth0", "mtu"]`. The bracket form is
/// accepted by the parser as sugar and flattened into key-value segments in
/// order of appearance.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<String>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns a new path with the given segment appended.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.push(segment);
        new
    }

    /// Returns true if `self` is a prefix of `other` (or equal to it).
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

/// Display the path in slash notation, `/interface/eth0/mtu`.
impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            f.write_str("/")?;
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl From<Vec<String>> for Path {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl From<Path> for Vec<String> {
    fn from(value: Path) -> Self {
        value.0
    }
}

impl<'a> FromIterator<&'a str> for Path {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        Self(iter.into_iter().map(|segment| segment.to_string()).collect())
    }
}

impl From<&str> for Path {
    /// Parse a slash separated path. A `[key=value]` suffix on a segment is
    /// flattened into key-value segments, in order of appearance.
    fn from(value: &str) -> Self {
        let mut segments = Vec::new();
        for raw in value.split('/').filter(|s| !s.is_empty()) {
            match raw.split_once('[') {
                Some((name, rest)) => {
                    segments.push(name.to_string());
                    for key_expr in rest.trim_end_matches(']').split("][") {
                        if let Some((_, key_value)) = key_expr.split_once('=') {
                            segments.push(key_value.to_string());
                        }
                    }
                }
                None => segments.push(raw.to_string()),
            }
        }
        Self(segments)
    }
}
