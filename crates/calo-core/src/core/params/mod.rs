//! # Parameters Module
//!
//! The ordered, named collection of design parameters that describes one proposed
//! calorimeter.
//!
//! ## Overview
//!
//! Every parameter is one of three explicitly tagged kinds:
//!
//! - **Continuous** - a real value with an inclusive lower bound, an optional upper bound
//!   and an optional cost, e.g. a layer thickness or a budget.
//! - **Categorical** - a finite ordered set of discrete choices with a parallel cost vector
//!   and a parallel selection-probability vector. The probabilities are what an optimizer
//!   differentiates through; the realized choice is the most probable one.
//! - **Fixed** - a non-numeric value that never participates in optimization, such as a
//!   material override or a feature flag.
//!
//! Insertion order of the [`dictionary::ParameterDictionary`] is semantically meaningful:
//! it is the order used when flattening parameters to tensors and the order in which the
//! per-layer geometry policy stacks layers.
//!
//! ## Key Components
//!
//! - [`spec`] - The tagged parameter kinds and their invariants
//! - [`dictionary`] - Ordered storage and typed, fail-loudly accessors
//! - [`document`] - The structured JSON document format used to exchange parameter sets
//! - [`error`] - Configuration errors raised by lookups and validation

pub mod dictionary;
pub mod document;
pub mod error;
pub mod spec;

pub use dictionary::ParameterDictionary;
pub use error::{ParameterError, SpecError};
pub use spec::{Categorical, Continuous, FixedValue, ParameterSpec};
