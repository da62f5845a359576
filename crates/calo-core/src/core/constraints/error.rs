use crate::core::params::ParameterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConstraintError {
    #[error("No tensor supplied for required parameter '{0}'")]
    MissingTensor(String),

    #[error("Tensor for '{name}' has {found} elements, expected {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Budget '{name}' must be a positive finite number, got {value}")]
    InvalidBudget { name: String, value: f64 },

    #[error("Parameter dictionary declares no complete layer slots")]
    EmptyTopology,

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("Tensor computation failed: {0}")]
    Tensor(#[from] candle_core::Error),
}
