//! Attribute module for Trellis
//!
//! This module defines the three cross-cutting attribute kinds attached to
//! tree nodes (memberships, visibility marks, and login schemas) together
//! with their write paths, which validate every create and delete against the
//! inheritance rules before touching the store.

pub mod types;
pub mod writes;

// Re-export main types for easier access
pub use types::*;
pub use writes::*;
