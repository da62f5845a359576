use crate::core::table::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Layer {layer} uses material '{material}', which the engine does not know")]
    UnknownMaterial { layer: usize, material: String },

    #[error("Unknown particle: '{0}'")]
    UnknownParticle(String),

    #[error("Invalid energy range [{min}, {max}] GeV")]
    InvalidEnergyRange { min: f64, max: f64 },

    #[error("Engine has no active geometry")]
    NotInitialized,

    #[error("Batch of '{particle}' events failed: {reason}")]
    Batch { particle: String, reason: String },

    #[error("Scratch file error for '{path}': {source}")]
    Scratch {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Result table error: {0}")]
    Table(#[from] TableError),
}
