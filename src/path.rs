//! Materialized path codec for the item tree.
//!
//! A `Path` encodes a node's full ancestor chain (root to self, inclusive) as a
//! dotted string of fixed-width labels. Each label is the lowercase-hex form of
//! a 128-bit id, which keeps every path sortable and prefix-queryable: the set
//! of strict descendants of `p` is exactly the half-open string range
//! `p. ..< p/`, because `/` is the ASCII successor of the separator and every
//! label byte sorts above it.
//!
//! The last label of a path *is* the node's own id, so relocating a subtree
//! means replacing a path prefix rather than recomputing any label.

use crate::constants::{LABEL_LEN, SEPARATOR, SEPARATOR_SUCCESSOR};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of an item in the resource tree.
///
/// The label-safe path encoding of an `ItemId` is its fixed-width 32-character
/// lowercase-hex form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the label-safe encoding of this id.
    pub fn label(&self) -> String {
        self.0.as_simple().to_string()
    }

    /// Parses an id from its label form.
    ///
    /// Fails with `Error::InvalidLabel` when the label is not exactly
    /// [`LABEL_LEN`] lowercase-hex characters. This indicates a programmer
    /// error (a hand-built path), not a runtime condition.
    pub fn from_label(label: &str) -> Result<Self> {
        if !is_valid_label(label) {
            return Err(Error::InvalidLabel(label.to_string()));
        }
        let uuid =
            Uuid::parse_str(label).map_err(|_| Error::InvalidLabel(label.to_string()))?;
        Ok(Self(uuid))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}

/// Identifier of an account, supplied by the external identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}

fn is_valid_label(label: &str) -> bool {
    label.len() == LABEL_LEN
        && label
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// A materialized path: the ordered chain of item ids from the root down to a
/// node, encoded as one dotted string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(String);

impl Path {
    /// The path of a root node: a single label.
    pub fn root_of(id: ItemId) -> Self {
        Self(id.label())
    }

    /// Encodes an ordered id chain (root first) into a path.
    ///
    /// Fails with `Error::InvalidLabel` on an empty chain.
    pub fn from_ids(ids: &[ItemId]) -> Result<Self> {
        if ids.is_empty() {
            return Err(Error::InvalidLabel("empty id chain".to_string()));
        }
        let labels: Vec<String> = ids.iter().map(ItemId::label).collect();
        Ok(Self(labels.join(&SEPARATOR.to_string())))
    }

    /// Parses a path from its string form, validating every label.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidLabel("empty path".to_string()));
        }
        for label in s.split(SEPARATOR) {
            if !is_valid_label(label) {
                return Err(Error::InvalidLabel(label.to_string()));
            }
        }
        Ok(Self(s.to_string()))
    }

    /// The raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the labels of this path, root first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Decodes the path back into its ordered id chain.
    pub fn ids(&self) -> Result<Vec<ItemId>> {
        self.labels().map(ItemId::from_label).collect()
    }

    /// The number of labels, which equals the node's depth (roots are depth 1).
    pub fn depth(&self) -> usize {
        self.labels().count()
    }

    /// The id of the node itself: the last label of the path.
    pub fn leaf_id(&self) -> Result<ItemId> {
        let start = self.0.rfind(SEPARATOR).map(|idx| idx + 1).unwrap_or(0);
        ItemId::from_label(&self.0[start..])
    }

    /// Whether this path is a root path (depth 1).
    pub fn is_root(&self) -> bool {
        !self.0.contains(SEPARATOR)
    }

    /// The path of a child of this node.
    pub fn child(&self, id: ItemId) -> Self {
        Self(format!("{}{SEPARATOR}{}", self.0, id.label()))
    }

    /// The parent path, or `None` for a root path.
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rfind(SEPARATOR)
            .map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Whether `self` is an ancestor of `of`, or `of` itself.
    ///
    /// The comparison is label-aware: a match requires a whole-label prefix
    /// followed by a separator, never a raw string prefix.
    pub fn is_ancestor_or_self(&self, of: &Path) -> bool {
        self == of || self.is_strict_ancestor_of(of)
    }

    /// Whether `self` is a strict (proper) ancestor of `of`.
    pub fn is_strict_ancestor_of(&self, of: &Path) -> bool {
        of.0.len() > self.0.len()
            && of.0.as_bytes()[self.0.len()] == SEPARATOR as u8
            && of.0.starts_with(&self.0)
    }

    /// Whether `self` is a strict descendant of `of`.
    pub fn is_strict_descendant_of(&self, of: &Path) -> bool {
        of.is_strict_ancestor_of(self)
    }

    /// The ancestor chain of this path, root to self inclusive.
    pub fn ancestors(&self) -> Vec<Path> {
        let mut chain = Vec::new();
        for (idx, byte) in self.0.bytes().enumerate() {
            if byte == SEPARATOR as u8 {
                chain.push(Self(self.0[..idx].to_string()));
            }
        }
        chain.push(self.clone());
        chain
    }

    /// Rewrites this path for a subtree relocation: drops the first
    /// `strip_depth` labels and grafts the remainder onto `onto` (or makes it
    /// a root chain when `onto` is `None`).
    ///
    /// Fails with `Error::InvalidLabel` when stripping would consume the whole
    /// path; the moving node itself must survive the rewrite.
    pub fn rebase(&self, strip_depth: usize, onto: Option<&Path>) -> Result<Self> {
        let kept: Vec<&str> = self.labels().skip(strip_depth).collect();
        if kept.is_empty() {
            return Err(Error::InvalidLabel(format!(
                "cannot strip {strip_depth} labels from a depth-{} path",
                self.depth()
            )));
        }
        let suffix = kept.join(&SEPARATOR.to_string());
        match onto {
            Some(prefix) => Ok(Self(format!("{}{SEPARATOR}{suffix}", prefix.0))),
            None => Ok(Self(suffix)),
        }
    }

    /// The half-open string range covering exactly the strict descendants of
    /// this path. Backing stores use it for prefix-range scans; the upper
    /// bound guarantees a sibling label sharing leading characters never
    /// matches.
    pub fn descendant_bounds(&self) -> (String, String) {
        (
            format!("{}{SEPARATOR}", self.0),
            format!("{}{SEPARATOR_SUCCESSOR}", self.0),
        )
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
