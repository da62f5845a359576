use super::layer::{Geometry, Layer};
use crate::core::materials::{DEFAULT_ABSORBER, DEFAULT_SCINTILLATOR};
use crate::core::params::{ParameterDictionary, ParameterError, ParameterSpec};
use tracing::{debug, warn};

pub const NUM_BLOCKS: &str = "num_blocks";
pub const THICKNESS_ABSORBER: &str = "thickness_absorber";
pub const THICKNESS_SCINTILLATOR: &str = "thickness_scintillator";
pub const ABSORBER_MATERIAL: &str = "absorber_material";
pub const SCINTILLATOR_MATERIAL: &str = "scintillator_material";

const THICKNESS_PREFIX: &str = "thickness_";

/// Strategy used to expand a parameter dictionary into layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryPolicy {
    /// `num_blocks` repetitions of one absorber/scintillator pair sharing the
    /// `thickness_absorber` and `thickness_scintillator` values.
    FixedBlocks,
    /// One layer per `thickness_absorber*` / `thickness_scintillator*` parameter, stacked
    /// in dictionary order.
    PerLayer,
}

impl GeometryPolicy {
    /// Picks [`FixedBlocks`](Self::FixedBlocks) iff a `num_blocks` parameter is present.
    pub fn select(params: &ParameterDictionary) -> Self {
        if params.contains(NUM_BLOCKS) {
            Self::FixedBlocks
        } else {
            Self::PerLayer
        }
    }

    /// Realizes the geometry under this policy.
    ///
    /// # Errors
    ///
    /// Returns a [`ParameterError`] if a parameter required by the policy is missing
    /// or has the wrong kind. An empty per-layer geometry is not an error; the engine
    /// rejects it when it is initialized.
    pub fn build(self, params: &ParameterDictionary) -> Result<Geometry, ParameterError> {
        let geometry = match self {
            Self::FixedBlocks => build_fixed_blocks(params)?,
            Self::PerLayer => build_per_layer(params)?,
        };
        debug!(
            policy = ?self,
            layers = geometry.len(),
            total_thickness = geometry.total_thickness(),
            "Geometry realized."
        );
        Ok(geometry)
    }
}

/// Selects the policy for `params` and builds the geometry in one call.
pub fn build_geometry(params: &ParameterDictionary) -> Result<Geometry, ParameterError> {
    GeometryPolicy::select(params).build(params)
}

fn build_fixed_blocks(params: &ParameterDictionary) -> Result<Geometry, ParameterError> {
    let num_blocks = block_count(params)?;
    let absorber_thickness = params.value(THICKNESS_ABSORBER)?;
    let scintillator_thickness = params.value(THICKNESS_SCINTILLATOR)?;
    let absorber_material = params
        .optional_text(ABSORBER_MATERIAL)?
        .unwrap_or(DEFAULT_ABSORBER);
    let scintillator_material = params
        .optional_text(SCINTILLATOR_MATERIAL)?
        .unwrap_or(DEFAULT_SCINTILLATOR);

    let mut geometry = Geometry::new();
    for _ in 0..num_blocks {
        geometry.push(Layer::absorber(absorber_thickness, absorber_material));
        geometry.push(Layer::sensitive(scintillator_thickness, scintillator_material));
    }
    Ok(geometry)
}

fn block_count(params: &ParameterDictionary) -> Result<usize, ParameterError> {
    match params.require(NUM_BLOCKS)? {
        ParameterSpec::Categorical(choice) => {
            choice
                .current()
                .parse::<usize>()
                .map_err(|_| ParameterError::WrongKind {
                    name: NUM_BLOCKS.to_string(),
                    expected: "integer choices",
                    found: "categorical",
                })
        }
        _ => params.count(NUM_BLOCKS),
    }
}

fn build_per_layer(params: &ParameterDictionary) -> Result<Geometry, ParameterError> {
    let mut geometry = Geometry::new();
    for (name, _) in params.iter() {
        if name.starts_with(THICKNESS_ABSORBER) {
            geometry.push(Layer::absorber(params.value(name)?, DEFAULT_ABSORBER));
        } else if name.starts_with(THICKNESS_SCINTILLATOR) {
            geometry.push(Layer::sensitive(params.value(name)?, DEFAULT_SCINTILLATOR));
        } else if name.starts_with(THICKNESS_PREFIX) {
            warn!(
                parameter = name,
                "Thickness parameter matches neither the absorber nor the scintillator prefix and is ignored."
            );
        }
    }
    Ok(geometry)
}
