//! Persistence of result tables.
//!
//! A trait-based interface ([`traits::TableFile`]) with a Parquet implementation
//! ([`parquet::ParquetFile`]). Writes through a path are all-or-nothing: the table is
//! written to a hidden sibling file and renamed into place only after the writer
//! has been closed successfully.

pub mod parquet;
pub mod traits;
