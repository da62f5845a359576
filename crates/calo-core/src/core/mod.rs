//! # Core Module
//!
//! Stateless building blocks of a calorimeter design trial.
//!
//! ## Architecture
//!
//! - **Parameters** ([`params`]) - The ordered, typed parameter dictionary and its document format
//! - **Geometry** ([`geometry`]) - Layers, the realized layer stack and the two construction policies
//! - **Materials** ([`materials`]) - Static registry of the material properties known to the simulation
//! - **Result Tables** ([`table`]) - Columnar per-event results, concatenation and ragged normalization
//! - **Table I/O** ([`io`]) - Atomic, schema-carrying persistence of result tables
//! - **Constraints** ([`constraints`]) - Layer topology and the differentiable budget penalty
//!
//! None of these modules hold global state; everything that touches the simulation
//! engine lives in [`crate::engine`].

pub mod constraints;
pub mod geometry;
pub mod io;
pub mod materials;
pub mod params;
pub mod table;
