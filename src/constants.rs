//! Constants used throughout the Trellis library.
//!
//! This module provides central definitions for the path encoding, especially
//! the label alphabet and the separator reserved between labels.

/// Separator between labels in a materialized path.
pub const SEPARATOR: char = '.';

/// Exact width of a path label: the 128-bit item id as lowercase hex.
pub const LABEL_LEN: usize = 32;

/// Upper bound of the half-open descendant scan range. The first character
/// after `SEPARATOR` in ASCII; every valid label byte sorts above it.
pub const SEPARATOR_SUCCESSOR: char = '/';
