//! Tree index: ancestor chains and descendant queries over the path space.
//!
//! The ancestor chain of a node is derived purely from its materialized path;
//! descendant queries are answered by the store's label-aware prefix-range
//! scan. The index borrows a store for the duration of one operation, so every
//! query it answers is consistent with the lock scope the caller holds.

use crate::Result;
use crate::item::Item;
use crate::path::Path;
use crate::store::Store;

/// Read-only view over the tree structure backed by a borrowed store.
pub struct TreeIndex<'a> {
    store: &'a dyn Store,
}

impl<'a> TreeIndex<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The ordered chain of paths from the root down to `path`, inclusive.
    pub fn ancestor_chain(&self, path: &Path) -> Vec<Path> {
        path.ancestors()
    }

    /// Every live item strictly below `path`, in path order.
    ///
    /// Finite and safe to re-invoke; each call re-runs the range scan.
    pub fn descendants_of(&self, path: &Path) -> Result<Vec<Item>> {
        Ok(self
            .store
            .items_under(path)?
            .into_iter()
            .filter(|item| !item.is_deleted())
            .collect())
    }

    /// The live direct children of `path`.
    pub fn children_of(&self, path: &Path) -> Result<Vec<Item>> {
        let child_depth = path.depth() + 1;
        Ok(self
            .descendants_of(path)?
            .into_iter()
            .filter(|item| item.depth() == child_depth)
            .collect())
    }

    /// Whether `candidate` lies strictly inside the subtree rooted at `of`.
    pub fn is_descendant(&self, candidate: &Path, of: &Path) -> bool {
        candidate.is_strict_descendant_of(of)
    }
}
