//!
//! Defines the storage trait and implementations.
//!
//! The `Store` trait defines the interface for persisting items and attribute
//! rows. This keeps the core engine logic (resolver, mutator, facade)
//! independent of the specific storage mechanism.

use crate::Result;
use crate::attrs::{LoginSchemaRow, MembershipRow, VisibilityRow};
use crate::item::Item;
use crate::path::{AccountId, ItemId, Path};
use chrono::{DateTime, Utc};
use std::any::Any;

mod in_memory;

pub use in_memory::InMemoryStore;

/// The rows making up one subtree, used to insert a copied subtree as a unit.
#[derive(Debug, Clone, Default)]
pub struct SubtreeRows {
    pub items: Vec<Item>,
    pub memberships: Vec<MembershipRow>,
    pub visibilities: Vec<VisibilityRow>,
    pub login_schemas: Vec<LoginSchemaRow>,
}

/// Store trait abstracting the underlying persistence for the item tree and
/// its attribute rows.
///
/// Implementations must maintain two indexes over items, by id and by path,
/// and answer descendant queries with a *label-aware* prefix-range scan over
/// the path index (see [`Path::descendant_bounds`]); a raw string-prefix
/// comparison would let sibling labels sharing leading characters bleed into
/// each other's subtrees.
///
/// The three `apply_*` methods are the transactional unit-of-work boundary:
/// each rewrites every affected item and attribute row as a single atomic
/// unit, so no reader may observe a tree where some descendants carry old
/// paths and others new ones. A store backed by a real transactional engine
/// maps each call to one transaction; the in-memory reference implementation
/// validates the full row set before touching any map.
///
/// All store implementations must be `Send` and `Sync` to allow sharing across
/// threads, and implement `Any` to allow for downcasting if needed. Callers
/// are expected to serialize access through a single lock scope per operation
/// (the facade does this), which is what isolates concurrent subtree moves
/// from one another and from attribute creation.
pub trait Store: Send + Sync + Any {
    // === Items ===

    /// Inserts an item, or replaces the stored record for the same id.
    fn put_item(&mut self, item: Item) -> Result<()>;

    /// Retrieves an item by id, or `Error::NotFound`.
    fn item(&self, id: &ItemId) -> Result<Item>;

    /// Retrieves the item at an exact path (live or soft-deleted), or
    /// `Error::NotFound`.
    fn item_by_path(&self, path: &Path) -> Result<Item>;

    /// Returns every item strictly below `path`, in path order, including
    /// soft-deleted ones. Callers filter liveness as needed; the mutator must
    /// see deleted descendants so their paths stay consistent across moves.
    fn items_under(&self, path: &Path) -> Result<Vec<Item>>;

    /// Returns all depth-1 items.
    fn root_items(&self) -> Result<Vec<Item>>;

    // === Memberships ===

    /// Inserts or replaces the membership row for `(row.path, row.account)`.
    fn put_membership(&mut self, row: MembershipRow) -> Result<()>;

    /// The membership row at an exact (path, account), if any.
    fn membership(&self, path: &Path, account: &AccountId)
    -> Result<Option<MembershipRow>>;

    /// Every membership row whose path is one of `chain`. One indexed lookup
    /// for the whole ancestor chain of a resolution.
    fn memberships_on(&self, chain: &[Path]) -> Result<Vec<MembershipRow>>;

    /// Every membership row at a strict descendant of `path`.
    fn memberships_under(&self, path: &Path) -> Result<Vec<MembershipRow>>;

    /// Removes one membership row, or `Error::NotFound`.
    fn remove_membership(&mut self, path: &Path, account: &AccountId) -> Result<()>;

    /// Removes every membership row held by `account`, returning the count.
    /// Used when the account itself is destroyed.
    fn remove_account_memberships(&mut self, account: &AccountId) -> Result<usize>;

    // === Visibility ===

    /// Inserts or replaces the visibility row at `row.path`.
    fn put_visibility(&mut self, row: VisibilityRow) -> Result<()>;

    /// The visibility row at an exact path, if any.
    fn visibility(&self, path: &Path) -> Result<Option<VisibilityRow>>;

    /// Every visibility row whose path is one of `chain`.
    fn visibilities_on(&self, chain: &[Path]) -> Result<Vec<VisibilityRow>>;

    /// Every visibility row at a strict descendant of `path`.
    fn visibilities_under(&self, path: &Path) -> Result<Vec<VisibilityRow>>;

    /// Removes the visibility row at `path`, or `Error::NotFound`.
    fn remove_visibility(&mut self, path: &Path) -> Result<()>;

    // === Login schemas ===

    /// Inserts or replaces the login schema at `row.path`.
    fn put_login_schema(&mut self, row: LoginSchemaRow) -> Result<()>;

    /// The login schema at an exact path, if any.
    fn login_schema(&self, path: &Path) -> Result<Option<LoginSchemaRow>>;

    /// Every login schema whose path is one of `chain`.
    fn login_schemas_on(&self, chain: &[Path]) -> Result<Vec<LoginSchemaRow>>;

    /// Every login schema at a strict descendant of `path`.
    fn login_schemas_under(&self, path: &Path) -> Result<Vec<LoginSchemaRow>>;

    /// Removes the login schema at `path`, or `Error::NotFound`.
    fn remove_login_schema(&mut self, path: &Path) -> Result<()>;

    // === Atomic subtree units ===

    /// Rewrites item paths and every attribute row referencing them, as one
    /// atomic unit. Each pair maps an existing path to its replacement; the
    /// caller supplies the complete affected set (the moved node and all of
    /// its descendants). Fails with `Error::InternalInconsistency`, leaving
    /// the store untouched, when a source path has no item or a target path
    /// is already occupied.
    fn apply_move(&mut self, rewrites: &[(Path, Path)]) -> Result<()>;

    /// Inserts a whole subtree's rows as one atomic unit. Fails with
    /// `Error::AlreadyExists`, leaving the store untouched, when any item
    /// path is already occupied.
    fn apply_insert(&mut self, rows: SubtreeRows) -> Result<()>;

    /// Soft-deletes the items at `paths` and removes every attribute row
    /// scoped to those paths, as one atomic unit.
    fn apply_delete(&mut self, paths: &[Path], deleted_at: DateTime<Utc>) -> Result<()>;

    /// Returns a reference to the store instance as a dynamic `Any` type.
    ///
    /// This allows for downcasting to a concrete store implementation if
    /// necessary, enabling access to implementation-specific methods.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to the store instance as a dynamic `Any` type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
