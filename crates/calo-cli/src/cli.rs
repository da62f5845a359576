use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "calo - Realize, simulate and score sampling calorimeter designs proposed by a design optimizer.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel event simulation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one full trial: build the geometry, simulate every particle category,
    /// write the result table and score the budgets.
    Run(RunArgs),
    /// Print the layer stack realized from a parameter document.
    Geometry(GeometryArgs),
    /// Evaluate the budget penalty and its gradient for a parameter document.
    Penalty(PenaltyArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    // --- Core Arguments ---
    /// Path to the JSON parameter document describing the proposed design.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub parameters: PathBuf,

    /// Path of the Parquet result table. Overrides `output.path` from the config file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Path to a trial configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Simulation Overrides ---
    /// Override the number of events simulated per particle category.
    #[arg(short, long, value_name = "INT")]
    pub num_events: Option<usize>,

    /// Override the random seed of the simulation engine.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Override the engine scratch directory purged after the results are written.
    #[arg(long, value_name = "PATH")]
    pub scratch_dir: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S simulation.num-events=500
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `geometry` subcommand.
#[derive(Args, Debug)]
pub struct GeometryArgs {
    /// Path to the JSON parameter document.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub parameters: PathBuf,
}

/// Arguments for the `penalty` subcommand.
#[derive(Args, Debug)]
pub struct PenaltyArgs {
    /// Path to the JSON parameter document.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub parameters: PathBuf,

    /// Number of absorber/scintillator layer slots to score.
    /// Inferred from the parameter names when omitted.
    #[arg(short, long, value_name = "INT")]
    pub layers: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_repeated_set_values_and_global_flags() {
        let cli = Cli::parse_from([
            "calo",
            "-vv",
            "-j",
            "4",
            "run",
            "-p",
            "params.json",
            "-o",
            "out.parquet",
            "-S",
            "simulation.seed=1",
            "-S",
            "constraints.layers=3",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.threads, Some(4));
        let Commands::Run(args) = cli.command else {
            panic!("Expected 'run' subcommand");
        };
        assert_eq!(args.parameters, PathBuf::from("params.json"));
        assert_eq!(args.output, Some(PathBuf::from("out.parquet")));
        assert_eq!(args.set_values.len(), 2);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["calo", "-q", "-v", "geometry", "-p", "params.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn parameters_are_required() {
        assert!(Cli::try_parse_from(["calo", "penalty"]).is_err());
    }
}
