use thiserror::Error;

/// Violations of a single parameter's own invariants.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpecError {
    #[error(
        "choices, costs and probabilities must have equal lengths (got {choices}, {costs}, {probabilities})"
    )]
    LengthMismatch {
        choices: usize,
        costs: usize,
        probabilities: usize,
    },
    #[error("a categorical parameter needs at least one choice")]
    NoChoices,
    #[error("probabilities must be non-negative and sum to 1 (sum = {sum})")]
    InvalidProbabilities { sum: f64 },
    #[error("current choice '{0}' is not one of the discrete values")]
    UnknownChoice(String),
    #[error("value {value} lies outside the bounds [{min}, {max}]")]
    OutOfBounds { value: f64, min: f64, max: f64 },
    #[error("lower bound {min} exceeds upper bound {max}")]
    InvertedBounds { min: f64, max: f64 },
    #[error("value is not a finite number")]
    NonFinite,
}

/// Configuration errors. These are never retried and are raised before any engine work.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("Missing required parameter: '{0}'")]
    Missing(String),

    #[error("Parameter '{name}' is {found}, expected {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Parameter '{name}' must hold a non-negative integer, got {value}")]
    NotACount { name: String, value: f64 },

    #[error("Duplicate parameter name: '{0}'")]
    Duplicate(String),

    #[error("Malformed parameter '{name}': {source}")]
    Malformed {
        name: String,
        #[source]
        source: SpecError,
    },

    #[error("Invalid entry '{name}' in parameter document: {reason}")]
    Document { name: String, reason: String },

    #[error("JSON error in parameter document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}
