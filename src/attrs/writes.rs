//! Attribute write paths for Trellis
//!
//! Every create re-runs the inheritance resolver for its attribute kind and
//! rejects writes that conflict with an effective value already present on
//! the ancestor chain (or, for visibility and login schemas, covering
//! descendants). Every delete refuses to remove a value where it is merely
//! inherited, and cascade-clears identical rows from the strict descendants
//! of the deletion point: "delete visibility" means "delete for the whole
//! subtree", as an explicit step, not a storage side effect.
//!
//! Callers are expected to hold their store lock across the resolver check
//! and the write; the check is only as good as the isolation scope it runs
//! in.

use crate::attrs::types::{
    AuthType, LoginSchemaRow, MembershipRow, PermissionLevel, SchemaStatus, Visibility,
    VisibilityRow,
};
use crate::path::{AccountId, Path};
use crate::resolver::Resolver;
use crate::store::Store;
use crate::{Error, Result};
use chrono::Utc;
use tracing::debug;

/// Fails with `Error::NotFound` unless a live item sits at `path`.
fn require_live_item(store: &dyn Store, path: &Path) -> Result<()> {
    match store.item_by_path(path) {
        Ok(item) if !item.is_deleted() => Ok(()),
        Ok(_) => Err(Error::NotFound),
        Err(e) => Err(e),
    }
}

/// Grants `account` the given level on the item at `path`.
///
/// At most one membership may exist per (path, account); a second create for
/// the same pair fails with `Error::AlreadyExists`. Grants for the same
/// account at other chain levels are legal; resolution is closest-wins.
pub fn create_membership(
    store: &mut dyn Store,
    path: &Path,
    account: AccountId,
    level: PermissionLevel,
    created_by: AccountId,
) -> Result<MembershipRow> {
    require_live_item(&*store, path)?;
    if store.membership(path, &account)?.is_some() {
        return Err(Error::AlreadyExists);
    }
    let row = MembershipRow::new(path.clone(), account, level, created_by);
    store.put_membership(row.clone())?;
    Ok(row)
}

/// Changes the level of an existing membership row at exactly `path`.
pub fn update_membership_level(
    store: &mut dyn Store,
    path: &Path,
    account: &AccountId,
    level: PermissionLevel,
) -> Result<MembershipRow> {
    let mut row = store.membership(path, account)?.ok_or(Error::NotFound)?;
    row.level = level;
    row.updated_at = Utc::now();
    store.put_membership(row.clone())?;
    Ok(row)
}

/// Removes the membership of `account` originating at exactly `path`, and
/// cascade-clears the account's rows from all strict descendants.
///
/// An inherited membership cannot be deleted here; it must be deleted at the
/// node it originates from.
pub fn delete_membership(
    store: &mut dyn Store,
    path: &Path,
    account: &AccountId,
) -> Result<()> {
    let effective = Resolver::new(&*store).effective_membership(path, account)?;
    match effective {
        None => return Err(Error::NotFound),
        Some(row) if row.path != *path => {
            return Err(Error::ConflictingInheritedAttribute(format!(
                "membership of {account} is inherited from {}; delete it there",
                row.path
            )));
        }
        Some(_) => {}
    }
    store.remove_membership(path, account)?;

    let below: Vec<MembershipRow> = store
        .memberships_under(path)?
        .into_iter()
        .filter(|row| row.account == *account)
        .collect();
    for row in &below {
        store.remove_membership(&row.path, account)?;
    }
    if !below.is_empty() {
        debug!(
            "cascade-cleared {} membership row(s) of {account} below {path}",
            below.len()
        );
    }
    Ok(())
}

/// Marks the item at `path` with a visibility kind.
///
/// Rejected with `Error::ConflictingInheritedAttribute` when the chain
/// already carries a visibility row (of either kind: a covered node holds
/// its visibility as inherited, never as its own), or when a strict
/// descendant carries a row of the opposite kind. A duplicate at the exact
/// path is `Error::AlreadyExists`.
pub fn create_visibility(
    store: &mut dyn Store,
    path: &Path,
    kind: Visibility,
    created_by: AccountId,
) -> Result<VisibilityRow> {
    require_live_item(&*store, path)?;
    if let Some(existing) = Resolver::new(&*store).effective_visibility(path)? {
        if existing.path == *path {
            return Err(Error::AlreadyExists);
        }
        return Err(Error::ConflictingInheritedAttribute(format!(
            "visibility is already inherited from {}",
            existing.path
        )));
    }
    for below in store.visibilities_under(path)? {
        if below.kind != kind {
            return Err(Error::ConflictingInheritedAttribute(format!(
                "descendant {} already carries a conflicting visibility",
                below.path
            )));
        }
    }
    let row = VisibilityRow::new(path.clone(), kind, created_by);
    store.put_visibility(row.clone())?;
    Ok(row)
}

/// Removes the visibility row originating at exactly `path`, and
/// cascade-clears same-kind rows from all strict descendants.
pub fn delete_visibility(store: &mut dyn Store, path: &Path) -> Result<()> {
    let effective = Resolver::new(&*store).effective_visibility(path)?;
    let row = match effective {
        None => return Err(Error::NotFound),
        Some(row) if row.path != *path => {
            return Err(Error::ConflictingInheritedAttribute(format!(
                "visibility is inherited from {}; delete it there",
                row.path
            )));
        }
        Some(row) => row,
    };
    store.remove_visibility(path)?;

    let below: Vec<VisibilityRow> = store
        .visibilities_under(path)?
        .into_iter()
        .filter(|candidate| candidate.kind == row.kind)
        .collect();
    for candidate in &below {
        store.remove_visibility(&candidate.path)?;
    }
    if !below.is_empty() {
        debug!("cascade-cleared {} visibility row(s) below {path}", below.len());
    }
    Ok(())
}

/// Installs a login-gate schema on the item at `path`.
///
/// Schemas never nest: the create is rejected when any schema is reachable on
/// the ancestor chain or present anywhere in the subtree below.
pub fn create_login_schema(
    store: &mut dyn Store,
    path: &Path,
    auth_type: AuthType,
    status: SchemaStatus,
) -> Result<LoginSchemaRow> {
    require_live_item(&*store, path)?;
    if let Some(existing) = Resolver::new(&*store).effective_login_schema(path)? {
        if existing.path == *path {
            return Err(Error::AlreadyExists);
        }
        return Err(Error::ConflictingInheritedAttribute(format!(
            "a login schema is already inherited from {}",
            existing.path
        )));
    }
    if let Some(below) = store.login_schemas_under(path)?.first() {
        return Err(Error::ConflictingInheritedAttribute(format!(
            "descendant {} already carries a login schema",
            below.path
        )));
    }
    let row = LoginSchemaRow::new(path.clone(), auth_type, status);
    store.put_login_schema(row.clone())?;
    Ok(row)
}

/// Changes the status of the schema at exactly `path`.
pub fn update_login_schema_status(
    store: &mut dyn Store,
    path: &Path,
    status: SchemaStatus,
) -> Result<LoginSchemaRow> {
    let mut row = store.login_schema(path)?.ok_or(Error::NotFound)?;
    row.status = status;
    row.updated_at = Utc::now();
    store.put_login_schema(row.clone())?;
    Ok(row)
}

/// Removes the login schema originating at exactly `path`, and cascade-clears
/// any stray schemas from strict descendants.
pub fn delete_login_schema(store: &mut dyn Store, path: &Path) -> Result<()> {
    let effective = Resolver::new(&*store).effective_login_schema(path)?;
    match effective {
        None => return Err(Error::NotFound),
        Some(row) if row.path != *path => {
            return Err(Error::ConflictingInheritedAttribute(format!(
                "login schema is inherited from {}; delete it there",
                row.path
            )));
        }
        Some(_) => {}
    }
    store.remove_login_schema(path)?;

    let below = store.login_schemas_under(path)?;
    for row in &below {
        store.remove_login_schema(&row.path)?;
    }
    if !below.is_empty() {
        debug!("cascade-cleared {} login schema(s) below {path}", below.len());
    }
    Ok(())
}
