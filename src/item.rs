//! Item records: the nodes of the hierarchical resource tree.

use crate::path::{AccountId, ItemId, Path};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node in the resource tree.
///
/// An item carries its materialized path; the path's last label is derived
/// from the item's own id, and its length equals the item's depth. Paths are
/// unique across all non-deleted items.
///
/// Items are soft-deleted by stamping `deleted_at` and are never physically
/// removed while descendants or attribute rows reference their path; the
/// subtree delete cascade is the one operation that clears both together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub path: Path,
    pub name: String,
    pub created_by: AccountId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Creates a new root item with a fresh id and a single-label path.
    pub fn new_root(name: impl Into<String>, created_by: AccountId) -> Self {
        let id = ItemId::new();
        let now = Utc::now();
        Self {
            id,
            path: Path::root_of(id),
            name: name.into(),
            created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Creates a new child of `parent` with a fresh id; the child's path is
    /// the parent path extended by the child's own label.
    pub fn new_child(parent: &Item, name: impl Into<String>, created_by: AccountId) -> Self {
        let id = ItemId::new();
        let now = Utc::now();
        Self {
            id,
            path: parent.path.child(id),
            name: name.into(),
            created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether this item has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The item's depth in the tree (roots are depth 1).
    pub fn depth(&self) -> usize {
        self.path.depth()
    }
}
