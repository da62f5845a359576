use super::scratch::ScratchDir;
use crate::core::constraints::LayerTopology;
use std::path::PathBuf;
use thiserror::Error;

/// Particle simulated when no categories are configured.
pub const DEFAULT_PARTICLE: &str = "pi+";
/// Numeric label of [`DEFAULT_PARTICLE`] (its rest mass in GeV).
pub const DEFAULT_LABEL: f32 = 0.211;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid energy range: minimum {min} GeV must be positive and not exceed maximum {max} GeV")]
    InvalidEnergyRange { min: f64, max: f64 },
    #[error("At least one particle category is required")]
    NoCategories,
    #[error("Particle category '{0}' is listed more than once")]
    DuplicateCategory(String),
}

/// One particle species to simulate and the numeric label written into `true_label`.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub particle: String,
    pub label: f32,
}

impl Category {
    pub fn new(particle: impl Into<String>, label: f32) -> Self {
        Self {
            particle: particle.into(),
            label,
        }
    }
}

pub fn default_categories() -> Vec<Category> {
    vec![Category::new(DEFAULT_PARTICLE, DEFAULT_LABEL)]
}

/// Inclusive range of primary particle energies in GeV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyRange {
    pub min: f64,
    pub max: f64,
}

impl Default for EnergyRange {
    fn default() -> Self {
        Self { min: 1.0, max: 50.0 }
    }
}

impl EnergyRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.min <= self.max {
            Ok(())
        } else {
            Err(ConfigError::InvalidEnergyRange {
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Events simulated per category.
    pub num_events: usize,
    pub energy_range: EnergyRange,
    /// Categories in the order their batches are run and concatenated.
    pub categories: Vec<Category>,
    /// Seed handed to the engine before the first batch, if any.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    pub output_path: PathBuf,
    /// Engine scratch directory purged once the result table is persisted.
    pub scratch: Option<ScratchDir>,
    /// Layer slots checked against the parameters before any engine work.
    pub topology: Option<LayerTopology>,
}

#[derive(Default)]
pub struct RunConfigBuilder {
    num_events: Option<usize>,
    energy_range: Option<EnergyRange>,
    categories: Option<Vec<Category>>,
    seed: Option<u64>,
    output_path: Option<PathBuf>,
    scratch: Option<ScratchDir>,
    topology: Option<LayerTopology>,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_events(mut self, num_events: usize) -> Self {
        self.num_events = Some(num_events);
        self
    }
    pub fn energy_range(mut self, range: EnergyRange) -> Self {
        self.energy_range = Some(range);
        self
    }
    pub fn categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = Some(categories);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn output_path(mut self, path: PathBuf) -> Self {
        self.output_path = Some(path);
        self
    }
    pub fn scratch(mut self, scratch: ScratchDir) -> Self {
        self.scratch = Some(scratch);
        self
    }
    pub fn topology(mut self, topology: LayerTopology) -> Self {
        self.topology = Some(topology);
        self
    }

    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let energy_range = self.energy_range.unwrap_or_default();
        energy_range.validate()?;

        let categories = self.categories.unwrap_or_else(default_categories);
        if categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }
        for (i, category) in categories.iter().enumerate() {
            if categories[..i].iter().any(|c| c.particle == category.particle) {
                return Err(ConfigError::DuplicateCategory(category.particle.clone()));
            }
        }

        let simulation = SimulationConfig {
            num_events: self
                .num_events
                .ok_or(ConfigError::MissingParameter("num_events"))?,
            energy_range,
            categories,
            seed: self.seed,
        };
        Ok(RunConfig {
            simulation,
            output_path: self
                .output_path
                .ok_or(ConfigError::MissingParameter("output_path"))?,
            scratch: self.scratch,
            topology: self.topology,
        })
    }
}
