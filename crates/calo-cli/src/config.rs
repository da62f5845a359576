use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use calodesign::core::constraints::{LayerTopology, MAX_COST, MAX_LENGTH};
use calodesign::core::params::ParameterDictionary;
use calodesign::engine::config::{self as core_config, Category, EnergyRange};
use calodesign::engine::scratch::{SHOWER_CACHE_EXTENSION, ScratchDir};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Parameter-document entry that supplies the per-category event count.
const NUM_EVENTS_PARAMETER: &str = "num_events";
const DEFAULT_NUM_EVENTS: usize = 100;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialCategory {
    particle: String,
    label: f32,
}

impl From<PartialCategory> for Category {
    fn from(p: PartialCategory) -> Self {
        Category::new(p.particle, p.label)
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSimulationConfig {
    num_events: Option<usize>,
    energy_min: Option<f64>,
    energy_max: Option<f64>,
    seed: Option<u64>,
    categories: Option<Vec<PartialCategory>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutputConfig {
    path: Option<PathBuf>,
    scratch_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialConstraintsConfig {
    /// Number of layer slots to validate and score; inferred from the parameters if absent.
    layers: Option<usize>,
    /// Disables topology validation and scoring altogether.
    enabled: Option<bool>,
}

/// A trial configuration file as written by the user, before CLI overrides and defaults.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialTrialConfig {
    simulation: Option<PartialSimulationConfig>,
    output: Option<PartialOutputConfig>,
    constraints: Option<PartialConstraintsConfig>,
}

impl PartialTrialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading trial configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Loads the file named by `--config`, or starts from an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        path.map(Self::from_file).transpose().map(Option::unwrap_or_default)
    }

    /// Applies `-S` settings and CLI flags on top of the file, then fills the remaining
    /// gaps with defaults taken from the parameter document.
    pub fn merge_with_cli(
        mut self,
        args: &RunArgs,
        parameters: &ParameterDictionary,
    ) -> Result<core_config::RunConfig> {
        self.apply_set_values(&args.set_values)?;

        let simulation = self.simulation.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();
        let constraints = self.constraints.take().unwrap_or_default();

        let num_events = match args.num_events.or(simulation.num_events) {
            Some(n) => n,
            None if parameters.contains(NUM_EVENTS_PARAMETER) => {
                parameters.count(NUM_EVENTS_PARAMETER)?
            }
            None => DEFAULT_NUM_EVENTS,
        };

        let defaults = EnergyRange::default();
        let energy_range = EnergyRange::new(
            simulation.energy_min.unwrap_or(defaults.min),
            simulation.energy_max.unwrap_or(defaults.max),
        );

        let output_path = args.output.clone().or(output.path).ok_or_else(|| {
            CliError::Config(
                "An output path is required either via `--output` or `output.path`.".to_string(),
            )
        })?;

        let mut builder = core_config::RunConfigBuilder::new()
            .num_events(num_events)
            .energy_range(energy_range)
            .output_path(output_path);

        if let Some(categories) = simulation.categories {
            builder = builder.categories(categories.into_iter().map(Into::into).collect());
        }
        if let Some(seed) = args.seed.or(simulation.seed) {
            builder = builder.seed(seed);
        }
        if let Some(dir) = args.scratch_dir.clone().or(output.scratch_dir) {
            builder = builder.scratch(ScratchDir::new(dir, SHOWER_CACHE_EXTENSION));
        }
        if let Some(topology) = Self::merge_topology(constraints, parameters) {
            builder = builder.topology(topology);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_topology(
        constraints: PartialConstraintsConfig,
        parameters: &ParameterDictionary,
    ) -> Option<LayerTopology> {
        if constraints.enabled == Some(false) {
            return None;
        }
        if let Some(layers) = constraints.layers {
            return Some(LayerTopology::new(layers));
        }
        let topology = LayerTopology::infer(parameters)?;
        if !(parameters.contains(MAX_LENGTH) && parameters.contains(MAX_COST)) {
            warn!(
                "Parameters declare {} layer slot(s) but no '{}'/'{}' budgets; skipping the penalty.",
                topology.num_layers(),
                MAX_LENGTH,
                MAX_COST
            );
            return None;
        }
        Some(topology)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key {
                "simulation.num-events" => {
                    self.simulation_mut().num_events = Some(parse_value(key, value)?);
                }
                "simulation.energy-min" => {
                    self.simulation_mut().energy_min = Some(parse_value(key, value)?);
                }
                "simulation.energy-max" => {
                    self.simulation_mut().energy_max = Some(parse_value(key, value)?);
                }
                "simulation.seed" => {
                    self.simulation_mut().seed = Some(parse_value(key, value)?);
                }
                "output.path" => {
                    self.output_mut().path = Some(PathBuf::from(value));
                }
                "output.scratch-dir" => {
                    self.output_mut().scratch_dir = Some(PathBuf::from(value));
                }
                "constraints.layers" => {
                    self.constraints_mut().layers = Some(parse_value(key, value)?);
                }
                "constraints.enabled" => {
                    self.constraints_mut().enabled = Some(parse_value(key, value)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn simulation_mut(&mut self) -> &mut PartialSimulationConfig {
        self.simulation.get_or_insert_with(Default::default)
    }

    fn output_mut(&mut self) -> &mut PartialOutputConfig {
        self.output.get_or_insert_with(Default::default)
    }

    fn constraints_mut(&mut self) -> &mut PartialConstraintsConfig {
        self.constraints.get_or_insert_with(Default::default)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use calodesign::core::params::{Categorical, Continuous};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let file_path = TEST_DIR.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut args = vec!["calo", "run", "-p", "params.json"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Run(args) => args,
            _ => panic!("Expected 'run' subcommand"),
        }
    }

    fn per_layer_parameters() -> ParameterDictionary {
        slot_parameters()
            .with(MAX_LENGTH, Continuous::new(150.0).fixed())
            .unwrap()
            .with(MAX_COST, Continuous::new(200_000.0).fixed())
            .unwrap()
    }

    fn slot_parameters() -> ParameterDictionary {
        let material = |choice: &str| {
            Categorical::uniform(vec![choice.to_string()], vec![1.0], choice).unwrap()
        };
        ParameterDictionary::new()
            .with("thickness_absorber_0", Continuous::new(9.0).with_min(0.0))
            .unwrap()
            .with("thickness_scintillator_0", Continuous::new(37.0).with_min(0.0))
            .unwrap()
            .with("material_absorber_0", material("G4_Pb"))
            .unwrap()
            .with("material_scintillator_0", material("G4_PbWO4"))
            .unwrap()
    }

    #[test]
    fn load_from_file_and_merge_with_defaults() {
        let config_path = write_config_file(
            "defaults.toml",
            r#"
            [output]
            path = "trial.parquet"
            "#,
        );
        let partial = PartialTrialConfig::load(Some(&config_path)).unwrap();

        let config = partial
            .merge_with_cli(&run_args(&[]), &ParameterDictionary::new())
            .unwrap();

        assert_eq!(config.simulation.num_events, 100);
        assert_eq!(config.simulation.energy_range, EnergyRange::new(1.0, 50.0));
        assert_eq!(config.simulation.categories, vec![Category::new("pi+", 0.211)]);
        assert_eq!(config.output_path, PathBuf::from("trial.parquet"));
        assert!(config.scratch.is_none());
        assert!(config.topology.is_none());
    }

    #[test]
    fn event_count_falls_back_to_the_parameter_document() {
        let parameters = ParameterDictionary::new()
            .with(NUM_EVENTS_PARAMETER, Continuous::new(800.0).fixed())
            .unwrap();
        let config = PartialTrialConfig::default()
            .merge_with_cli(&run_args(&["-o", "out.parquet"]), &parameters)
            .unwrap();
        assert_eq!(config.simulation.num_events, 800);
    }

    #[test]
    fn cli_args_override_file_values() {
        let config_path = write_config_file(
            "override.toml",
            r#"
            [simulation]
            num-events = 50 # Will be overridden
            seed = 1
            energy-min = 5.0
            energy-max = 20.0

            [[simulation.categories]]
            particle = "e-"
            label = 0.000511

            [[simulation.categories]]
            particle = "pi+"
            label = 0.211

            [output]
            path = "from-file.parquet"
            scratch-dir = "file-scratch"
            "#,
        );
        let args = run_args(&[
            "-o",
            "from-cli.parquet",
            "--num-events",
            "10",
            "--seed",
            "9",
            "--scratch-dir",
            "cli-scratch",
        ]);

        let config = PartialTrialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&args, &ParameterDictionary::new())
            .unwrap();

        assert_eq!(config.simulation.num_events, 10);
        assert_eq!(config.simulation.seed, Some(9));
        assert_eq!(config.simulation.energy_range, EnergyRange::new(5.0, 20.0));
        assert_eq!(
            config.simulation.categories,
            vec![Category::new("e-", 0.000511), Category::new("pi+", 0.211)]
        );
        assert_eq!(config.output_path, PathBuf::from("from-cli.parquet"));
        assert_eq!(
            config.scratch,
            Some(ScratchDir::new("cli-scratch", SHOWER_CACHE_EXTENSION))
        );
    }

    #[test]
    fn set_values_override_file_and_defaults() {
        let config_path = write_config_file(
            "set.toml",
            r#"
            [simulation]
            num-events = 5 # Will be overridden by --set

            [constraints]
            layers = 2 # Will be overridden by --set
            "#,
        );
        let args = run_args(&[
            "-S",
            "simulation.num-events=20",
            "-S",
            "output.path=set.parquet",
            "-S",
            "constraints.layers=4",
        ]);

        let config = PartialTrialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_cli(&args, &ParameterDictionary::new())
            .unwrap();

        assert_eq!(config.simulation.num_events, 20);
        assert_eq!(config.output_path, PathBuf::from("set.parquet"));
        assert_eq!(config.topology, Some(LayerTopology::new(4)));
    }

    #[test]
    fn topology_is_inferred_unless_disabled() {
        let inferred = PartialTrialConfig::default()
            .merge_with_cli(&run_args(&["-o", "out.parquet"]), &per_layer_parameters())
            .unwrap();
        assert_eq!(inferred.topology.map(|t| t.num_layers()), Some(1));

        let disabled = PartialTrialConfig::default()
            .merge_with_cli(
                &run_args(&["-o", "out.parquet", "-S", "constraints.enabled=false"]),
                &per_layer_parameters(),
            )
            .unwrap();
        assert!(disabled.topology.is_none());
    }

    #[test]
    fn topology_is_not_inferred_without_budgets() {
        let config = PartialTrialConfig::default()
            .merge_with_cli(&run_args(&["-o", "out.parquet"]), &slot_parameters())
            .unwrap();
        assert!(config.topology.is_none());

        let explicit = PartialTrialConfig::default()
            .merge_with_cli(
                &run_args(&["-o", "out.parquet", "-S", "constraints.layers=1"]),
                &slot_parameters(),
            )
            .unwrap();
        assert_eq!(explicit.topology, Some(LayerTopology::new(1)));
    }

    #[test]
    fn missing_output_path_returns_error() {
        let result =
            PartialTrialConfig::default().merge_with_cli(&run_args(&[]), &ParameterDictionary::new());
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn invalid_set_values_return_errors() {
        for bad in ["simulation.num-events", "simulation.num-events=many", "unknown.key=1"] {
            let result = PartialTrialConfig::default().merge_with_cli(
                &run_args(&["-o", "out.parquet", "-S", bad]),
                &ParameterDictionary::new(),
            );
            assert!(matches!(result, Err(CliError::Config(_))), "accepted '{}'", bad);
        }
    }

    #[test]
    fn invalid_energy_range_is_a_config_error() {
        let result = PartialTrialConfig::default().merge_with_cli(
            &run_args(&["-o", "out.parquet", "-S", "simulation.energy-min=60"]),
            &ParameterDictionary::new(),
        );
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let config_path = write_config_file("unknown.toml", "[simulation]\nevents = 3\n");
        let result = PartialTrialConfig::from_file(&config_path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }
}
