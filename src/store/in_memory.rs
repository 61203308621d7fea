use crate::attrs::{LoginSchemaRow, MembershipRow, VisibilityRow};
use crate::item::Item;
use crate::path::{AccountId, ItemId, Path};
use crate::store::{Store, SubtreeRows};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::ops::Bound;
use std::path::Path as FsPath;

/// A simple in-memory store implementation using `BTreeMap`s keyed by the
/// string form of each path.
///
/// The sorted maps make the label-aware descendant scan a plain range query
/// over [`Path::descendant_bounds`]. This store is suitable for testing,
/// development, or scenarios where data persistence is not strictly required
/// or is handled externally (e.g., by saving/loading the entire state to/from
/// a file).
///
/// It provides basic persistence capabilities via `save_to_file` and
/// `load_from_file`, serializing the maps to JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InMemoryStore {
    /// Items indexed by path; the primary index every range scan runs over.
    items: BTreeMap<String, Item>,
    /// Secondary index: item id to current path.
    ids: HashMap<ItemId, String>,
    /// Membership rows, grouped per path and keyed by account within it.
    memberships: BTreeMap<String, BTreeMap<AccountId, MembershipRow>>,
    visibilities: BTreeMap<String, VisibilityRow>,
    login_schemas: BTreeMap<String, LoginSchemaRow>,
}

impl InMemoryStore {
    /// Creates a new, empty `InMemoryStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves the entire store state to a specified file as JSON.
    ///
    /// # Arguments
    /// * `path` - The path to the file where the state should be saved.
    ///
    /// # Returns
    /// A `Result` indicating success or an I/O or serialization error.
    pub fn save_to_file<P: AsRef<FsPath>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(Error::Io)
    }

    /// Loads the store state from a specified JSON file.
    ///
    /// If the file does not exist, a new, empty `InMemoryStore` is returned.
    ///
    /// # Arguments
    /// * `path` - The path to the file from which to load the state.
    ///
    /// # Returns
    /// A `Result` containing the loaded `InMemoryStore` or an I/O or
    /// deserialization error.
    pub fn load_from_file<P: AsRef<FsPath>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Ok(Self::new());
        }

        let json = fs::read_to_string(path).map_err(Error::Io)?;
        let store: Self = serde_json::from_str(&json)?;
        Ok(store)
    }

    /// Returns the number of items currently stored, including soft-deleted ones.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    fn range_under<'a, V>(
        map: &'a BTreeMap<String, V>,
        path: &Path,
    ) -> impl Iterator<Item = (&'a String, &'a V)> {
        let (lo, hi) = path.descendant_bounds();
        map.range((Bound::Included(lo), Bound::Excluded(hi)))
    }
}

impl Store for InMemoryStore {
    fn put_item(&mut self, item: Item) -> Result<()> {
        if let Some(existing) = self.items.get(item.path.as_str()) {
            if existing.id != item.id {
                return Err(Error::AlreadyExists);
            }
        }
        // An id keeps a single canonical path; drop a stale entry if the
        // record moved through an in-place update.
        if let Some(old_path) = self.ids.get(&item.id) {
            if old_path.as_str() != item.path.as_str() {
                let stale = old_path.clone();
                self.items.remove(&stale);
            }
        }
        self.ids.insert(item.id, item.path.as_str().to_string());
        self.items.insert(item.path.as_str().to_string(), item);
        Ok(())
    }

    fn item(&self, id: &ItemId) -> Result<Item> {
        let path = self.ids.get(id).ok_or(Error::NotFound)?;
        self.items.get(path).cloned().ok_or(Error::NotFound)
    }

    fn item_by_path(&self, path: &Path) -> Result<Item> {
        self.items.get(path.as_str()).cloned().ok_or(Error::NotFound)
    }

    fn items_under(&self, path: &Path) -> Result<Vec<Item>> {
        Ok(Self::range_under(&self.items, path)
            .map(|(_, item)| item.clone())
            .collect())
    }

    fn root_items(&self) -> Result<Vec<Item>> {
        Ok(self
            .items
            .values()
            .filter(|item| item.path.is_root())
            .cloned()
            .collect())
    }

    fn put_membership(&mut self, row: MembershipRow) -> Result<()> {
        self.memberships
            .entry(row.path.as_str().to_string())
            .or_default()
            .insert(row.account, row);
        Ok(())
    }

    fn membership(
        &self,
        path: &Path,
        account: &AccountId,
    ) -> Result<Option<MembershipRow>> {
        Ok(self
            .memberships
            .get(path.as_str())
            .and_then(|per_path| per_path.get(account))
            .cloned())
    }

    fn memberships_on(&self, chain: &[Path]) -> Result<Vec<MembershipRow>> {
        let mut rows = Vec::new();
        for path in chain {
            if let Some(per_path) = self.memberships.get(path.as_str()) {
                rows.extend(per_path.values().cloned());
            }
        }
        Ok(rows)
    }

    fn memberships_under(&self, path: &Path) -> Result<Vec<MembershipRow>> {
        Ok(Self::range_under(&self.memberships, path)
            .flat_map(|(_, per_path)| per_path.values().cloned())
            .collect())
    }

    fn remove_membership(&mut self, path: &Path, account: &AccountId) -> Result<()> {
        let per_path = self
            .memberships
            .get_mut(path.as_str())
            .ok_or(Error::NotFound)?;
        per_path.remove(account).ok_or(Error::NotFound)?;
        if per_path.is_empty() {
            self.memberships.remove(path.as_str());
        }
        Ok(())
    }

    fn remove_account_memberships(&mut self, account: &AccountId) -> Result<usize> {
        let mut removed = 0;
        self.memberships.retain(|_, per_path| {
            if per_path.remove(account).is_some() {
                removed += 1;
            }
            !per_path.is_empty()
        });
        Ok(removed)
    }

    fn put_visibility(&mut self, row: VisibilityRow) -> Result<()> {
        self.visibilities.insert(row.path.as_str().to_string(), row);
        Ok(())
    }

    fn visibility(&self, path: &Path) -> Result<Option<VisibilityRow>> {
        Ok(self.visibilities.get(path.as_str()).cloned())
    }

    fn visibilities_on(&self, chain: &[Path]) -> Result<Vec<VisibilityRow>> {
        Ok(chain
            .iter()
            .filter_map(|path| self.visibilities.get(path.as_str()).cloned())
            .collect())
    }

    fn visibilities_under(&self, path: &Path) -> Result<Vec<VisibilityRow>> {
        Ok(Self::range_under(&self.visibilities, path)
            .map(|(_, row)| row.clone())
            .collect())
    }

    fn remove_visibility(&mut self, path: &Path) -> Result<()> {
        self.visibilities
            .remove(path.as_str())
            .map(|_| ())
            .ok_or(Error::NotFound)
    }

    fn put_login_schema(&mut self, row: LoginSchemaRow) -> Result<()> {
        self.login_schemas.insert(row.path.as_str().to_string(), row);
        Ok(())
    }

    fn login_schema(&self, path: &Path) -> Result<Option<LoginSchemaRow>> {
        Ok(self.login_schemas.get(path.as_str()).cloned())
    }

    fn login_schemas_on(&self, chain: &[Path]) -> Result<Vec<LoginSchemaRow>> {
        Ok(chain
            .iter()
            .filter_map(|path| self.login_schemas.get(path.as_str()).cloned())
            .collect())
    }

    fn login_schemas_under(&self, path: &Path) -> Result<Vec<LoginSchemaRow>> {
        Ok(Self::range_under(&self.login_schemas, path)
            .map(|(_, row)| row.clone())
            .collect())
    }

    fn remove_login_schema(&mut self, path: &Path) -> Result<()> {
        self.login_schemas
            .remove(path.as_str())
            .map(|_| ())
            .ok_or(Error::NotFound)
    }

    fn apply_move(&mut self, rewrites: &[(Path, Path)]) -> Result<()> {
        // Validate the whole set before touching any map, so a bad rewrite
        // list leaves the store unchanged.
        let sources: HashSet<&str> = rewrites.iter().map(|(old, _)| old.as_str()).collect();
        let mut moved_items = Vec::with_capacity(rewrites.len());
        for (old, new) in rewrites {
            let mut item = self
                .items
                .get(old.as_str())
                .cloned()
                .ok_or_else(|| {
                    Error::InternalInconsistency(format!("move source path {old} has no item"))
                })?;
            if self.items.contains_key(new.as_str()) && !sources.contains(new.as_str()) {
                return Err(Error::InternalInconsistency(format!(
                    "move target path {new} is already occupied"
                )));
            }
            item.path = new.clone();
            moved_items.push(item);
        }

        // Detach every affected row first; rewrites within one subtree must
        // not trample each other.
        let mut moved_memberships = Vec::new();
        let mut moved_visibilities = Vec::new();
        let mut moved_schemas = Vec::new();
        for (old, new) in rewrites {
            self.items.remove(old.as_str());

            if let Some(per_path) = self.memberships.remove(old.as_str()) {
                moved_memberships.push((new.clone(), per_path));
            }
            if let Some(row) = self.visibilities.remove(old.as_str()) {
                moved_visibilities.push((new.clone(), row));
            }
            if let Some(row) = self.login_schemas.remove(old.as_str()) {
                moved_schemas.push((new.clone(), row));
            }
        }

        for item in moved_items {
            self.ids.insert(item.id, item.path.as_str().to_string());
            self.items.insert(item.path.as_str().to_string(), item);
        }
        for (new, mut per_path) in moved_memberships {
            for row in per_path.values_mut() {
                row.path = new.clone();
            }
            self.memberships.insert(new.as_str().to_string(), per_path);
        }
        for (new, mut row) in moved_visibilities {
            row.path = new.clone();
            self.visibilities.insert(new.as_str().to_string(), row);
        }
        for (new, mut row) in moved_schemas {
            row.path = new.clone();
            self.login_schemas.insert(new.as_str().to_string(), row);
        }
        Ok(())
    }

    fn apply_insert(&mut self, rows: SubtreeRows) -> Result<()> {
        for item in &rows.items {
            if self.items.contains_key(item.path.as_str()) || self.ids.contains_key(&item.id)
            {
                return Err(Error::AlreadyExists);
            }
        }
        for item in rows.items {
            self.ids.insert(item.id, item.path.as_str().to_string());
            self.items.insert(item.path.as_str().to_string(), item);
        }
        for row in rows.memberships {
            self.memberships
                .entry(row.path.as_str().to_string())
                .or_default()
                .insert(row.account, row);
        }
        for row in rows.visibilities {
            self.visibilities.insert(row.path.as_str().to_string(), row);
        }
        for row in rows.login_schemas {
            self.login_schemas.insert(row.path.as_str().to_string(), row);
        }
        Ok(())
    }

    fn apply_delete(&mut self, paths: &[Path], deleted_at: DateTime<Utc>) -> Result<()> {
        for path in paths {
            if let Some(item) = self.items.get_mut(path.as_str()) {
                if item.deleted_at.is_none() {
                    item.deleted_at = Some(deleted_at);
                }
            }
            self.memberships.remove(path.as_str());
            self.visibilities.remove(path.as_str());
            self.login_schemas.remove(path.as_str());
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
