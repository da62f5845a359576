//! # calodesign Core Library
//!
//! Realizes and scores a single proposed design of a layered sampling calorimeter
//! during iterative design-space exploration.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture to keep the pure parts of
//! a trial separate from the stateful simulation boundary.
//!
//! - **[`core`]: The Foundation.** Stateless data models and pure functions: the ordered
//!   parameter dictionary, the geometry builder, result tables and their columnar
//!   persistence, and the differentiable budget penalty.
//!
//! - **[`engine`]: The Simulation Boundary.** The simulation engine contract, the scoped
//!   engine session that guarantees a single active geometry, the batch runner that
//!   aggregates labeled particle batches, scratch-file handling and run configuration.
//!
//! - **[`workflows`]: The Public API.** Ties `core` and `engine` together to execute one
//!   complete trial: build the geometry, simulate, persist, clean up and score.

pub mod core;
pub mod engine;
pub mod workflows;
