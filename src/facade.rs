//! Authorization facade: the single entry point collaborating modules use.
//!
//! `Trellis` owns the store behind a mutex and runs every operation (reads,
//! attribute writes, and whole subtree mutations) under one lock
//! acquisition. That single scope is what serializes concurrent moves of
//! overlapping subtrees and keeps each attribute create's inheritance
//! revalidation inside the same isolation boundary as its write.
//!
//! The facade combines resolver output with the ownership rule: an account
//! that created an item on the chain, and has no membership row governing it
//! anywhere on that chain, holds Admin there. A membership row always takes
//! precedence; closest-wins can cap a creator down, never up.

use crate::attrs::{
    self, AuthType, LoginSchemaRow, MembershipRow, PermissionLevel, SchemaStatus, Visibility,
};
use crate::events::{Notifier, NullNotifier, TreeEvent};
use crate::index::TreeIndex;
use crate::item::Item;
use crate::mutator::{CopyOutcome, DeleteOutcome, MoveOutcome, SubtreeMutator};
use crate::path::{AccountId, ItemId, Path};
use crate::resolver::Resolver;
use crate::store::Store;
use crate::{Error, Result};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

/// Outcome of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Why a permission check denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No membership governs the account on the chain, and the account
    /// created none of the chain's items.
    NoMembership,
    /// The governing grant is below the requested minimum.
    InsufficientLevel { held: PermissionLevel },
}

/// The authorization and tree-mutation facade.
pub struct Trellis {
    store: Arc<Mutex<Box<dyn Store>>>,
    notifier: Arc<dyn Notifier>,
}

impl Trellis {
    /// Creates a facade over the given store with no event consumer wired up.
    pub fn new(store: Box<dyn Store>) -> Self {
        Self::with_notifier(store, Arc::new(NullNotifier))
    }

    /// Creates a facade that hands committed mutation events to `notifier`.
    pub fn with_notifier(store: Box<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            notifier,
        }
    }

    /// Get a reference to the shared store.
    pub fn store(&self) -> &Arc<Mutex<Box<dyn Store>>> {
        &self.store
    }

    /// Helper function to lock the store mutex.
    fn lock_store(&self) -> Result<MutexGuard<'_, Box<dyn Store>>> {
        self.store
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("Failed to lock store")))
    }

    fn live_item(store: &dyn Store, id: &ItemId) -> Result<Item> {
        let item = store.item(id)?;
        if item.is_deleted() {
            return Err(Error::NotFound);
        }
        Ok(item)
    }

    fn live_item_at(store: &dyn Store, path: &Path) -> Result<Item> {
        let item = store.item_by_path(path)?;
        if item.is_deleted() {
            return Err(Error::NotFound);
        }
        Ok(item)
    }

    /// The core decision: closest-wins membership, then the creator rule.
    fn decide(
        store: &dyn Store,
        path: &Path,
        account: &AccountId,
        minimum: PermissionLevel,
    ) -> Result<Decision> {
        Self::live_item_at(store, path)?;

        if let Some(row) = Resolver::new(store).effective_membership(path, account)? {
            return Ok(if row.level >= minimum {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::InsufficientLevel { held: row.level })
            });
        }

        // No grant anywhere on the chain: fall back to ownership. Creating
        // an item confers Admin over its subtree until a membership row says
        // otherwise.
        for chain_path in path.ancestors() {
            match store.item_by_path(&chain_path) {
                Ok(item) if !item.is_deleted() && item.created_by == *account => {
                    return Ok(Decision::Allow);
                }
                Ok(_) => {}
                Err(Error::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(Decision::Deny(DenyReason::NoMembership))
    }

    fn require_level(
        store: &dyn Store,
        path: &Path,
        account: &AccountId,
        minimum: PermissionLevel,
    ) -> Result<()> {
        match Self::decide(store, path, account, minimum)? {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(Error::PermissionDenied(format!(
                "{minimum:?} required on {path} for {account}: {reason:?}"
            ))),
        }
    }

    // === Item lifecycle ===

    /// Creates a new top-level item owned by `creator`.
    pub fn create_root(&self, name: impl Into<String>, creator: AccountId) -> Result<Item> {
        let item = Item::new_root(name, creator);
        let mut guard = self.lock_store()?;
        guard.put_item(item.clone())?;
        Ok(item)
    }

    /// Creates a child under `parent`. Requires Write on the parent.
    pub fn create_child(
        &self,
        parent: &ItemId,
        name: impl Into<String>,
        creator: AccountId,
    ) -> Result<Item> {
        let mut guard = self.lock_store()?;
        let store = &mut **guard;
        let parent_item = Self::live_item(&*store, parent)?;
        Self::require_level(&*store, &parent_item.path, &creator, PermissionLevel::Write)?;
        let item = Item::new_child(&parent_item, name, creator);
        store.put_item(item.clone())?;
        Ok(item)
    }

    /// Renames an item. Requires Write on the item.
    pub fn rename_item(
        &self,
        id: &ItemId,
        name: impl Into<String>,
        actor: AccountId,
    ) -> Result<Item> {
        let mut guard = self.lock_store()?;
        let store = &mut **guard;
        let mut item = Self::live_item(&*store, id)?;
        Self::require_level(&*store, &item.path, &actor, PermissionLevel::Write)?;
        item.name = name.into();
        item.updated_at = Utc::now();
        store.put_item(item.clone())?;
        Ok(item)
    }

    /// Retrieves a live item by id.
    pub fn item(&self, id: &ItemId) -> Result<Item> {
        let guard = self.lock_store()?;
        Self::live_item(&**guard, id)
    }

    /// Retrieves the live item at a path.
    pub fn item_at(&self, path: &Path) -> Result<Item> {
        let guard = self.lock_store()?;
        Self::live_item_at(&**guard, path)
    }

    /// The live direct children of an item.
    pub fn children_of(&self, id: &ItemId) -> Result<Vec<Item>> {
        let guard = self.lock_store()?;
        let store = &**guard;
        let item = Self::live_item(store, id)?;
        TreeIndex::new(store).children_of(&item.path)
    }

    /// Every live descendant of an item, in path order.
    pub fn descendants_of(&self, id: &ItemId) -> Result<Vec<Item>> {
        let guard = self.lock_store()?;
        let store = &**guard;
        let item = Self::live_item(store, id)?;
        TreeIndex::new(store).descendants_of(&item.path)
    }

    /// All live top-level items.
    pub fn roots(&self) -> Result<Vec<Item>> {
        let guard = self.lock_store()?;
        Ok(guard
            .root_items()?
            .into_iter()
            .filter(|item| !item.is_deleted())
            .collect())
    }

    // === Authorization queries ===

    /// Does `account` hold at least `minimum` on the item at `path`?
    pub fn check_permission(
        &self,
        path: &Path,
        account: &AccountId,
        minimum: PermissionLevel,
    ) -> Result<Decision> {
        let guard = self.lock_store()?;
        Self::decide(&**guard, path, account, minimum)
    }

    /// The visibility effective at `path`, own or inherited.
    pub fn effective_visibility(&self, path: &Path) -> Result<Option<Visibility>> {
        let guard = self.lock_store()?;
        let store = &**guard;
        Self::live_item_at(store, path)?;
        Ok(Resolver::new(store)
            .effective_visibility(path)?
            .map(|row| row.kind))
    }

    /// Whether anonymous callers may see the item at `path`: Public, and only
    /// Public, qualifies.
    pub fn visible_to_anonymous(&self, path: &Path) -> Result<bool> {
        Ok(self.effective_visibility(path)? == Some(Visibility::Public))
    }

    /// The login schema effective at `path`, own or inherited.
    pub fn effective_login_schema(&self, path: &Path) -> Result<Option<LoginSchemaRow>> {
        let guard = self.lock_store()?;
        let store = &**guard;
        Self::live_item_at(store, path)?;
        Resolver::new(store).effective_login_schema(path)
    }

    // === Attribute writes (all require Admin on the path or an ancestor) ===

    /// Grants `account` a permission level on the item at `path`.
    pub fn grant_membership(
        &self,
        path: &Path,
        account: AccountId,
        level: PermissionLevel,
        actor: AccountId,
    ) -> Result<MembershipRow> {
        let mut guard = self.lock_store()?;
        let store = &mut **guard;
        Self::require_level(&*store, path, &actor, PermissionLevel::Admin)?;
        attrs::create_membership(store, path, account, level, actor)
    }

    /// Changes the level of an existing grant at exactly `path`.
    pub fn update_membership_level(
        &self,
        path: &Path,
        account: &AccountId,
        level: PermissionLevel,
        actor: AccountId,
    ) -> Result<MembershipRow> {
        let mut guard = self.lock_store()?;
        let store = &mut **guard;
        Self::require_level(&*store, path, &actor, PermissionLevel::Admin)?;
        attrs::update_membership_level(store, path, account, level)
    }

    /// Revokes the grant originating at exactly `path`, clearing the
    /// account's rows from the subtree below.
    pub fn revoke_membership(
        &self,
        path: &Path,
        account: &AccountId,
        actor: AccountId,
    ) -> Result<()> {
        let mut guard = self.lock_store()?;
        let store = &mut **guard;
        Self::require_level(&*store, path, &actor, PermissionLevel::Admin)?;
        attrs::delete_membership(store, path, account)
    }

    /// Removes every membership row held by `account`. Invoked by the
    /// identity provider when the account itself is destroyed; bypasses the
    /// admin guard for that reason.
    pub fn purge_account(&self, account: &AccountId) -> Result<usize> {
        let mut guard = self.lock_store()?;
        guard.remove_account_memberships(account)
    }

    /// Marks the item at `path` Public or Hidden.
    pub fn set_visibility(
        &self,
        path: &Path,
        kind: Visibility,
        actor: AccountId,
    ) -> Result<attrs::VisibilityRow> {
        let mut guard = self.lock_store()?;
        let store = &mut **guard;
        Self::require_level(&*store, path, &actor, PermissionLevel::Admin)?;
        attrs::create_visibility(store, path, kind, actor)
    }

    /// Removes the visibility mark originating at exactly `path`, for the
    /// whole subtree.
    pub fn clear_visibility(&self, path: &Path, actor: AccountId) -> Result<()> {
        let mut guard = self.lock_store()?;
        let store = &mut **guard;
        Self::require_level(&*store, path, &actor, PermissionLevel::Admin)?;
        attrs::delete_visibility(store, path)
    }

    /// Installs a login gate on the item at `path`.
    pub fn set_login_schema(
        &self,
        path: &Path,
        auth_type: AuthType,
        status: SchemaStatus,
        actor: AccountId,
    ) -> Result<LoginSchemaRow> {
        let mut guard = self.lock_store()?;
        let store = &mut **guard;
        Self::require_level(&*store, path, &actor, PermissionLevel::Admin)?;
        attrs::create_login_schema(store, path, auth_type, status)
    }

    /// Changes the status of the login gate at exactly `path`.
    pub fn set_login_schema_status(
        &self,
        path: &Path,
        status: SchemaStatus,
        actor: AccountId,
    ) -> Result<LoginSchemaRow> {
        let mut guard = self.lock_store()?;
        let store = &mut **guard;
        Self::require_level(&*store, path, &actor, PermissionLevel::Admin)?;
        attrs::update_login_schema_status(store, path, status)
    }

    /// Removes the login gate originating at exactly `path`.
    pub fn clear_login_schema(&self, path: &Path, actor: AccountId) -> Result<()> {
        let mut guard = self.lock_store()?;
        let store = &mut **guard;
        Self::require_level(&*store, path, &actor, PermissionLevel::Admin)?;
        attrs::delete_login_schema(store, path)
    }

    // === Subtree mutation ===

    /// Moves an item and its subtree under `dest_parent` (or to the top
    /// level). Requires Admin on the moving item and Write on the
    /// destination parent. Emits `TreeEvent::SubtreeMoved` on commit.
    pub fn move_subtree(
        &self,
        id: &ItemId,
        dest_parent: Option<&ItemId>,
        actor: AccountId,
    ) -> Result<MoveOutcome> {
        let outcome = {
            let mut guard = self.lock_store()?;
            let store = &mut **guard;
            let item = Self::live_item(&*store, id)?;
            Self::require_level(&*store, &item.path, &actor, PermissionLevel::Admin)?;
            if let Some(dest_id) = dest_parent {
                let dest = Self::live_item(&*store, dest_id)?;
                Self::require_level(&*store, &dest.path, &actor, PermissionLevel::Write)?;
            }
            SubtreeMutator::new(store).move_subtree(id, dest_parent)?
        };
        if !outcome.moved_paths.is_empty() {
            self.notifier.notify(&TreeEvent::SubtreeMoved {
                moved_paths: outcome.moved_paths.clone(),
            });
        }
        Ok(outcome)
    }

    /// Copies an item and its live subtree under `dest_parent` (or to the top
    /// level). Requires Read on the source and Write on the destination
    /// parent. Emits `TreeEvent::SubtreeCopied` on commit.
    pub fn copy_subtree(
        &self,
        id: &ItemId,
        dest_parent: Option<&ItemId>,
        actor: AccountId,
    ) -> Result<CopyOutcome> {
        let outcome = {
            let mut guard = self.lock_store()?;
            let store = &mut **guard;
            let item = Self::live_item(&*store, id)?;
            Self::require_level(&*store, &item.path, &actor, PermissionLevel::Read)?;
            if let Some(dest_id) = dest_parent {
                let dest = Self::live_item(&*store, dest_id)?;
                Self::require_level(&*store, &dest.path, &actor, PermissionLevel::Write)?;
            }
            SubtreeMutator::new(store).copy_subtree(id, dest_parent, actor)?
        };
        self.notifier.notify(&TreeEvent::SubtreeCopied {
            copied_paths: outcome.copied_paths.clone(),
        });
        Ok(outcome)
    }

    /// Soft-deletes an item and its whole subtree, clearing every attribute
    /// row scoped to it. Requires Admin. Emits `TreeEvent::SubtreeDeleted`.
    pub fn delete_subtree(&self, id: &ItemId, actor: AccountId) -> Result<DeleteOutcome> {
        let outcome = {
            let mut guard = self.lock_store()?;
            let store = &mut **guard;
            let item = Self::live_item(&*store, id)?;
            Self::require_level(&*store, &item.path, &actor, PermissionLevel::Admin)?;
            SubtreeMutator::new(store).delete_subtree(id)?
        };
        self.notifier.notify(&TreeEvent::SubtreeDeleted {
            removed_paths: outcome.removed_paths.clone(),
        });
        Ok(outcome)
    }
}
