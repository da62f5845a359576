use calodesign::core::constraints::ConstraintError;
use calodesign::core::params::ParameterError;
use calodesign::workflows::trial::TrialError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Trial(#[from] TrialError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
