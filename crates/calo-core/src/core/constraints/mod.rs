//! # Budget Constraints
//!
//! Differentiable scoring of a parameter set against its length and cost budgets.
//!
//! The optimizer hands over a [`TensorView`]: one tensor per parameter, a scalar for
//! continuous thicknesses and a probability vector for categorical material choices.
//! The [`PenaltyEvaluator`] marginalizes each layer's material cost over its selection
//! probabilities, so the resulting penalty has gradients with respect to both the
//! thicknesses and the probabilities.
//!
//! Which `(index, kind)` layer slots exist is declared up front by a [`LayerTopology`]
//! and checked against the parameter dictionary when the evaluator is built.

pub mod error;
pub mod penalty;
pub mod tensors;
pub mod topology;

pub use error::ConstraintError;
pub use penalty::{MAX_COST, MAX_LENGTH, PenaltyBreakdown, PenaltyEvaluator, expected_cost, penalty};
pub use tensors::{TensorView, TrainableParameters};
pub use topology::{LayerKind, LayerTopology};
