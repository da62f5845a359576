//! # Geometry Module
//!
//! Translates a [`ParameterDictionary`](crate::core::params::ParameterDictionary) into the
//! ordered stack of physical layers handed to the simulation engine.
//!
//! ## Key Components
//!
//! - [`layer`] - `Layer`, its absorber/sensitive role and the ordered `Geometry`
//! - [`builder`] - The two construction policies: fixed block count and per-layer thicknesses

pub mod builder;
pub mod layer;

pub use builder::{GeometryPolicy, build_geometry};
pub use layer::{Geometry, Layer, LayerRole};
