//! Inheritance resolution for Trellis
//!
//! This module reduces the attribute rows found along a node's ancestor chain
//! to one effective value per attribute kind.
//!
//! ## Design Approach
//!
//! One chain walk serves all three attribute kinds:
//! - **Membership**: closest-wins; the row for the querying account at the
//!   greatest depth governs, regardless of level. A Read grant close to the
//!   node overrides an Admin grant inherited from higher up; deeper shared
//!   subtrees reduce trust, they never escalate it.
//! - **Visibility**: existence-wins; any row on the chain is the effective
//!   value. Conflicting kinds on one chain are prevented at write time.
//! - **Login schema**: closest-wins, first-found; nesting is prevented at
//!   write time, so at most one row exists on any chain.
//!
//! `None` is a meaningful result ("no inherited attribute"), not an error. A
//! row whose path has no live item is a fatal consistency violation: it means
//! a subtree cascade failed, and the resolver surfaces it instead of silently
//! ignoring the row.

use crate::attrs::{LoginSchemaRow, MembershipRow, VisibilityRow};
use crate::path::{AccountId, Path};
use crate::store::Store;
use crate::{Error, Result};
use tracing::error;

/// Row types the resolver can liveness-check against the item tree.
trait ChainRow {
    fn row_path(&self) -> &Path;
}

impl ChainRow for MembershipRow {
    fn row_path(&self) -> &Path {
        &self.path
    }
}

impl ChainRow for VisibilityRow {
    fn row_path(&self) -> &Path {
        &self.path
    }
}

impl ChainRow for LoginSchemaRow {
    fn row_path(&self) -> &Path {
        &self.path
    }
}

/// Inheritance resolver over a borrowed store.
///
/// Resolution is read-only and stateless per call: resolving twice with no
/// intervening writes returns identical results.
pub struct Resolver<'a> {
    store: &'a dyn Store,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The membership governing `account` at `target`, if any.
    ///
    /// Closest-wins: among the chain rows matching the account, the one at
    /// maximum depth is returned (ties are impossible; each path level holds
    /// at most one row per account). `None` means the account has no direct
    /// grant anywhere on the chain; ownership fallbacks are the facade's
    /// concern.
    pub fn effective_membership(
        &self,
        target: &Path,
        account: &AccountId,
    ) -> Result<Option<MembershipRow>> {
        let rows = self.live_rows_on_chain(target, |store, chain| {
            store.memberships_on(chain)
        })?;
        Ok(rows
            .into_iter()
            .filter(|row| row.account == *account)
            .max_by_key(|row| row.path.depth()))
    }

    /// The visibility inherited at `target`, if any.
    ///
    /// Existence-wins: a single row anywhere on the chain covers the whole
    /// subtree below it. Two rows of different kinds on one chain indicate a
    /// failed write-time check and are surfaced as a consistency violation.
    pub fn effective_visibility(&self, target: &Path) -> Result<Option<VisibilityRow>> {
        let rows = self.live_rows_on_chain(target, |store, chain| {
            store.visibilities_on(chain)
        })?;
        if let Some(first) = rows.first() {
            if rows.iter().any(|row| row.kind != first.kind) {
                let msg = format!(
                    "conflicting visibility kinds on the ancestor chain of {target}"
                );
                error!("{msg}");
                return Err(Error::InternalInconsistency(msg));
            }
        }
        // Deepest row for determinism; with the invariant held, any row
        // yields the same kind.
        Ok(rows.into_iter().max_by_key(|row| row.path.depth()))
    }

    /// The login schema governing `target`, if any.
    ///
    /// Closest-wins, first-found: the row at the ancestor nearest the target.
    /// Write-time nesting checks keep the chain down to at most one row.
    pub fn effective_login_schema(&self, target: &Path) -> Result<Option<LoginSchemaRow>> {
        let rows = self.live_rows_on_chain(target, |store, chain| {
            store.login_schemas_on(chain)
        })?;
        Ok(rows.into_iter().max_by_key(|row| row.path.depth()))
    }

    /// Fetches the rows of one attribute kind along the ancestor chain of
    /// `target` and verifies each references a live item.
    fn live_rows_on_chain<R, F>(&self, target: &Path, fetch: F) -> Result<Vec<R>>
    where
        R: ChainRow,
        F: FnOnce(&dyn Store, &[Path]) -> Result<Vec<R>>,
    {
        let chain = target.ancestors();
        let rows = fetch(self.store, &chain)?;
        for row in &rows {
            let live = match self.store.item_by_path(row.row_path()) {
                Ok(item) => !item.is_deleted(),
                Err(Error::NotFound) => false,
                Err(e) => return Err(e),
            };
            if !live {
                let msg = format!(
                    "attribute row at {} references no live item; a subtree cascade failed",
                    row.row_path()
                );
                error!("{msg}");
                return Err(Error::InternalInconsistency(msg));
            }
        }
        Ok(rows)
    }
}
