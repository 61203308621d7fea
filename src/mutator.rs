//! Subtree mutation: move, copy, and delete of a node and all descendants.
//!
//! A move runs through the phases `Requested -> PathsValidated ->
//! DescendantPathsRewritten -> AttributeConflictsRechecked -> Committed`, with
//! `Aborted` reachable from every non-terminal phase. Phases 1-3 are pure
//! validation and computation: always safely retryable, with zero writes on
//! failure. The commit is a single [`Store::apply_move`] call, the one step
//! that requires atomicity from the storage layer: every descendant path and
//! every attribute row referencing one is rewritten together, or nothing is.
//!
//! Callers hold the store lock across a whole mutation. That serializes
//! overlapping subtree moves and keeps the destination conflict recheck in
//! the same isolation scope as the rewrite it guards.

use crate::item::Item;
use crate::path::{AccountId, ItemId, Path};
use crate::resolver::Resolver;
use crate::store::{Store, SubtreeRows};
use crate::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

/// Phases of a subtree move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePhase {
    Requested,
    PathsValidated,
    DescendantPathsRewritten,
    AttributeConflictsRechecked,
    Committed,
    Aborted,
}

/// Result of a committed move: the relocated item and the complete set of
/// (old, new) path pairs, root first.
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub item: Item,
    pub moved_paths: Vec<(Path, Path)>,
}

/// Result of a committed copy: the fresh subtree root and the (source, copy)
/// path pairs, root first.
#[derive(Debug, Clone)]
pub struct CopyOutcome {
    pub root: Item,
    pub copied_paths: Vec<(Path, Path)>,
}

/// Result of a committed subtree delete.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub removed_paths: Vec<Path>,
}

/// Subtree mutator over an exclusively borrowed store.
pub struct SubtreeMutator<'a> {
    store: &'a mut dyn Store,
}

impl<'a> SubtreeMutator<'a> {
    pub fn new(store: &'a mut dyn Store) -> Self {
        Self { store }
    }

    fn live_item(&self, id: &ItemId) -> Result<Item> {
        let item = self.store.item(id)?;
        if item.is_deleted() {
            return Err(Error::NotFound);
        }
        Ok(item)
    }

    fn abort(phase: MovePhase, err: Error) -> Error {
        debug!(from = ?phase, to = ?MovePhase::Aborted, "subtree move aborted: {err}");
        err
    }

    /// Moves the item and its whole subtree under `dest_parent`, or to the
    /// top level when `dest_parent` is `None`.
    ///
    /// Aborts with `Error::CycleDetected` when the destination lies inside
    /// the moving subtree (the item itself included), and with
    /// `Error::ConflictingInheritedAttribute` when a visibility or login
    /// schema row carried by the subtree clashes with one inherited at the
    /// destination. No validation failure leaves any write behind.
    ///
    /// Moving under the current parent is a no-op and returns an empty path
    /// set.
    pub fn move_subtree(
        &mut self,
        id: &ItemId,
        dest_parent: Option<&ItemId>,
    ) -> Result<MoveOutcome> {
        debug!(phase = ?MovePhase::Requested, item = %id, "subtree move");
        let item = self.live_item(id)?;
        let dest = match dest_parent {
            Some(dest_id) => Some(
                self.live_item(dest_id)
                    .map_err(|e| Self::abort(MovePhase::Requested, e))?,
            ),
            None => None,
        };

        let dest_path = dest.as_ref().map(|d| d.path.clone());
        if item.path.parent() == dest_path {
            return Ok(MoveOutcome {
                item,
                moved_paths: Vec::new(),
            });
        }
        if let Some(dest_path) = &dest_path {
            if item.path.is_ancestor_or_self(dest_path) {
                return Err(Self::abort(MovePhase::Requested, Error::CycleDetected));
            }
        }
        debug!(phase = ?MovePhase::PathsValidated, item = %id);

        // Compute the full rewrite set before any write becomes visible; a
        // partial rewrite would corrupt every prefix query over the subtree.
        let strip = item.path.depth() - 1;
        let mut rewrites = vec![(
            item.path.clone(),
            item.path.rebase(strip, dest_path.as_ref())?,
        )];
        for descendant in self.store.items_under(&item.path)? {
            let new_path = descendant.path.rebase(strip, dest_path.as_ref())?;
            rewrites.push((descendant.path, new_path));
        }
        debug!(
            phase = ?MovePhase::DescendantPathsRewritten,
            item = %id,
            count = rewrites.len(),
        );

        if let Some(dest_path) = &dest_path {
            self.recheck_destination_conflicts(&item.path, dest_path)
                .map_err(|e| Self::abort(MovePhase::DescendantPathsRewritten, e))?;
        }
        debug!(phase = ?MovePhase::AttributeConflictsRechecked, item = %id);

        self.store.apply_move(&rewrites)?;
        debug!(phase = ?MovePhase::Committed, item = %id, count = rewrites.len());

        let item = self.store.item(id)?;
        Ok(MoveOutcome {
            item,
            moved_paths: rewrites,
        })
    }

    /// Verifies that the attribute rows carried by the subtree at `source`
    /// can coexist with what the destination chain already inherits.
    fn recheck_destination_conflicts(&self, source: &Path, dest: &Path) -> Result<()> {
        let mut own_visibilities = self.store.visibilities_under(source)?;
        if let Some(row) = self.store.visibility(source)? {
            own_visibilities.push(row);
        }
        if !own_visibilities.is_empty() {
            let inherited = Resolver::new(&*self.store).effective_visibility(dest)?;
            if let Some(inherited) = inherited {
                for own in &own_visibilities {
                    if own.kind != inherited.kind {
                        return Err(Error::ConflictingInheritedAttribute(format!(
                            "subtree row at {} conflicts with visibility inherited at {}",
                            own.path, inherited.path
                        )));
                    }
                }
            }
        }

        let mut own_schemas = self.store.login_schemas_under(source)?;
        if let Some(row) = self.store.login_schema(source)? {
            own_schemas.push(row);
        }
        if !own_schemas.is_empty() {
            let inherited = Resolver::new(&*self.store).effective_login_schema(dest)?;
            if let Some(inherited) = inherited {
                return Err(Error::ConflictingInheritedAttribute(format!(
                    "subtree carries a login schema but one is already inherited from {}",
                    inherited.path
                )));
            }
        }
        Ok(())
    }

    /// Copies the item and its live descendants under `dest_parent` (or to
    /// the top level), minting fresh ids; paths embed ids, so a copy can
    /// never share labels with its source. Attribute rows scoped to the
    /// copied paths are duplicated onto the copies; the same destination
    /// conflict recheck as for moves applies.
    pub fn copy_subtree(
        &mut self,
        id: &ItemId,
        dest_parent: Option<&ItemId>,
        actor: AccountId,
    ) -> Result<CopyOutcome> {
        let source = self.live_item(id)?;
        let dest = match dest_parent {
            Some(dest_id) => Some(self.live_item(dest_id)?),
            None => None,
        };
        let dest_path = dest.as_ref().map(|d| d.path.clone());

        if let Some(dest_path) = &dest_path {
            self.recheck_destination_conflicts(&source.path, dest_path)?;
        }

        let now = Utc::now();
        let new_root_id = ItemId::new();
        let new_root_path = match &dest_path {
            Some(dest_path) => dest_path.child(new_root_id),
            None => Path::root_of(new_root_id),
        };
        let mut path_map: HashMap<String, Path> = HashMap::new();
        path_map.insert(source.path.as_str().to_string(), new_root_path.clone());

        let mut items = vec![Item {
            id: new_root_id,
            path: new_root_path.clone(),
            name: source.name.clone(),
            created_by: actor,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }];
        let mut copied_paths = vec![(source.path.clone(), new_root_path.clone())];

        // items_under returns path order, so parents always precede children.
        for descendant in self.store.items_under(&source.path)? {
            if descendant.is_deleted() {
                continue;
            }
            let parent_old = descendant.path.parent().ok_or_else(|| {
                Error::InternalInconsistency(format!(
                    "descendant {} of {} has no parent path",
                    descendant.path, source.path
                ))
            })?;
            let parent_new = path_map
                .get(parent_old.as_str())
                .ok_or_else(|| {
                    Error::InternalInconsistency(format!(
                        "live descendant {} hangs off a deleted parent {parent_old}",
                        descendant.path
                    ))
                })?
                .clone();
            let new_id = ItemId::new();
            let new_path = parent_new.child(new_id);
            path_map.insert(descendant.path.as_str().to_string(), new_path.clone());
            copied_paths.push((descendant.path.clone(), new_path.clone()));
            items.push(Item {
                id: new_id,
                path: new_path,
                name: descendant.name.clone(),
                created_by: actor,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
        }

        let mut rows = SubtreeRows {
            items,
            ..SubtreeRows::default()
        };
        let chain = vec![source.path.clone()];
        let mut memberships = self.store.memberships_on(&chain)?;
        memberships.extend(self.store.memberships_under(&source.path)?);
        for mut row in memberships {
            if let Some(new_path) = path_map.get(row.path.as_str()) {
                row.path = new_path.clone();
                rows.memberships.push(row);
            }
        }
        let mut visibilities = self.store.visibilities_on(&chain)?;
        visibilities.extend(self.store.visibilities_under(&source.path)?);
        for mut row in visibilities {
            if let Some(new_path) = path_map.get(row.path.as_str()) {
                row.path = new_path.clone();
                rows.visibilities.push(row);
            }
        }
        let mut schemas = self.store.login_schemas_on(&chain)?;
        schemas.extend(self.store.login_schemas_under(&source.path)?);
        for mut row in schemas {
            if let Some(new_path) = path_map.get(row.path.as_str()) {
                row.path = new_path.clone();
                rows.login_schemas.push(row);
            }
        }

        self.store.apply_insert(rows)?;
        debug!(item = %id, count = copied_paths.len(), "subtree copied");

        let root = self.store.item(&new_root_id)?;
        Ok(CopyOutcome { root, copied_paths })
    }

    /// Soft-deletes the item and every descendant, removing all attribute
    /// rows scoped to those paths in the same atomic unit.
    pub fn delete_subtree(&mut self, id: &ItemId) -> Result<DeleteOutcome> {
        let item = self.live_item(id)?;
        let mut paths = vec![item.path.clone()];
        for descendant in self.store.items_under(&item.path)? {
            paths.push(descendant.path);
        }
        self.store.apply_delete(&paths, Utc::now())?;
        debug!(item = %id, count = paths.len(), "subtree deleted");
        Ok(DeleteOutcome {
            removed_paths: paths,
        })
    }
}
