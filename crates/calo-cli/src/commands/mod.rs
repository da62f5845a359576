pub mod geometry;
pub mod penalty;
pub mod run;

use crate::error::{CliError, Result};
use calodesign::core::params::ParameterDictionary;
use std::path::Path;
use tracing::info;

/// Reads the JSON parameter document shared by every subcommand.
pub fn load_parameters(path: &Path) -> Result<ParameterDictionary> {
    info!("Loading parameter document from {:?}", path);
    let parameters =
        ParameterDictionary::from_json_file(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
    info!(
        parameters = parameters.len(),
        optimizable = parameters.optimizable_names().count(),
        "Parameter document loaded."
    );
    Ok(parameters)
}
