//!
//! Trellis: a hierarchical item-tree authorization and attribute-inheritance engine.
//! Items form a tree encoded as materialized dotted-label paths; cross-cutting
//! attributes attach to individual nodes but resolve per-subtree via ancestor lookup.
//!
//! ## Core Concepts
//!
//! * **Paths (`path::Path`)**: A node's full ancestor chain encoded as a sortable,
//!   prefix-queryable dotted string. The last label of a path is derived from the
//!   node's own id, so relocating a subtree replaces a path *prefix*.
//! * **Items (`item::Item`)**: The units of the resource tree. Soft-deleted, never
//!   physically removed outside of an explicit subtree delete.
//! * **Stores (`store::Store`)**: A pluggable persistence layer for items and
//!   attribute rows, exposing label-aware prefix-range scans and atomic multi-row
//!   rewrites.
//! * **Attributes (`attrs`)**: Memberships, visibility marks, and login schemas.
//!   All three are keyed by the same path space and consumed by the same
//!   ancestor-walk, differing only in their reduction policy.
//! * **Resolver (`resolver::Resolver`)**: Walks the ancestor chain of a target path
//!   and reduces attribute rows to one effective value per kind.
//! * **Mutator (`mutator`)**: Subtree move/copy/delete with atomic path rewriting
//!   and re-validation of inherited attributes at the destination.
//! * **Facade (`facade::Trellis`)**: The only entry point collaborating modules
//!   use for authorization decisions and tree mutation.

pub mod attrs;
pub mod constants;
pub mod events;
pub mod facade;
pub mod index;
pub mod item;
pub mod mutator;
pub mod path;
pub mod resolver;
pub mod store;

/// Re-export the facade for easier access.
pub use facade::Trellis;

/// Result type used throughout the Trellis library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Trellis library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Item or attribute row absent. Recoverable.
    #[error("Not found")]
    NotFound,

    /// An attribute row already exists where at most one is allowed.
    #[error("Already exists")]
    AlreadyExists,

    /// An id could not be encoded or decoded as a path label. Programmer error,
    /// treated as fatal: well-formed ids always produce valid labels.
    #[error("Invalid path label: {0}")]
    InvalidLabel(String),

    /// An attribute row references a path with no live item. Indicates a failed
    /// cascade; never caught and retried.
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// The requested write conflicts with an attribute inherited from elsewhere
    /// on the ancestor chain (or covering descendants). Recoverable.
    #[error("Conflicting inherited attribute: {0}")]
    ConflictingInheritedAttribute(String),

    /// A subtree move would place a node inside its own subtree. Recoverable.
    #[error("Cycle detected: cannot move a node into its own subtree")]
    CycleDetected,

    /// The acting account lacks the permission the operation requires.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
