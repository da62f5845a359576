//! # Result Tables
//!
//! Homogeneous, column-oriented per-event results: one row per simulated event, a
//! fixed set of named columns, and support for the ragged per-event sequences
//! (e.g. variable-length hit lists) that simulation engines produce natively.
//!
//! Ragged columns arrive in a jagged `content + offsets` layout and must be
//! normalized into a flat per-row sequence column ([`Column::List`]) before a table
//! is persisted, because the storage format only accepts fixed-shape columns.

pub mod column;
pub mod error;
pub mod result_table;

pub use column::{Column, ColumnKind, JaggedArray};
pub use error::TableError;
pub use result_table::{ResultTable, TRUE_LABEL};
