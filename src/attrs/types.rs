//! Core attribute data structures for Trellis
//!
//! This module defines the row types persisted by the attribute stores. All
//! three kinds are keyed by the same path space as items and are consumed by
//! the identical ancestor-walk in the resolver; they differ only in their
//! reduction policy.

use crate::path::{AccountId, Path};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Permission levels for membership grants.
///
/// Levels are ordered such that "higher" levels include all "lower" ones:
/// Read < Write < Admin. Note that inheritance resolution is *closest-wins*,
/// not highest-wins; the ordering only answers "does the effective grant
/// satisfy the requested minimum".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PermissionLevel {
    Read,
    Write,
    Admin,
}

impl PermissionLevel {
    /// Check if this level allows writing data.
    pub fn can_write(&self) -> bool {
        matches!(self, PermissionLevel::Write | PermissionLevel::Admin)
    }

    /// Check if this level allows administrative operations.
    pub fn can_admin(&self) -> bool {
        matches!(self, PermissionLevel::Admin)
    }
}

/// A membership grant: `account` holds `level` on the item at `path` and,
/// unless a closer grant overrides it, on the whole subtree below.
///
/// Invariant: at most one membership per (path, account) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRow {
    pub path: Path,
    pub account: AccountId,
    pub level: PermissionLevel,
    pub created_by: AccountId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MembershipRow {
    pub fn new(
        path: Path,
        account: AccountId,
        level: PermissionLevel,
        created_by: AccountId,
    ) -> Self {
        let now = Utc::now();
        Self {
            path,
            account,
            level,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Visibility mark kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Reachable by anonymous callers.
    Public,
    /// Withheld from listings even for authenticated members.
    Hidden,
}

/// A visibility mark on the item at `path`, inherited by the whole subtree.
///
/// Invariants: at most one row per path, and no ancestor chain may carry two
/// rows of different kinds. A node already covered by an ancestor's row of
/// either kind cannot receive its own; it is inherited, not own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityRow {
    pub path: Path,
    pub kind: Visibility,
    pub created_by: AccountId,
    pub created_at: DateTime<Utc>,
}

impl VisibilityRow {
    pub fn new(path: Path, kind: Visibility, created_by: AccountId) -> Self {
        Self {
            path,
            kind,
            created_by,
            created_at: Utc::now(),
        }
    }
}

/// How callers identify themselves at a login gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthType {
    Username,
    UsernamePassword,
    Anonymous,
    AnonymousPassword,
}

/// Lifecycle status of a login schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaStatus {
    /// Gate is enforced and accepting logins.
    Active,
    /// Gate is enforced but new logins are refused.
    Freeze,
    /// Gate is retained but not enforced.
    Disabled,
}

/// A login-gate schema on the item at `path`, governing the whole subtree.
///
/// Invariant: at most one schema reachable per chain. A descendant cannot
/// define its own schema when an ancestor already has one, and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSchemaRow {
    pub path: Path,
    pub auth_type: AuthType,
    pub status: SchemaStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoginSchemaRow {
    pub fn new(path: Path, auth_type: AuthType, status: SchemaStatus) -> Self {
        let now = Utc::now();
        Self {
            path,
            auth_type,
            status,
            created_at: now,
            updated_at: now,
        }
    }
}
