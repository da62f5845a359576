use crate::cli::RunArgs;
use crate::commands::load_parameters;
use crate::config::PartialTrialConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use calodesign::engine::progress::ProgressReporter;
use calodesign::engine::shower::{ShowerEngine, ShowerSettings};
use calodesign::workflows;
use tracing::info;

pub async fn run(args: RunArgs) -> Result<()> {
    let parameters = load_parameters(&args.parameters)?;

    let partial_config = PartialTrialConfig::load(args.config.as_deref())?;
    info!("Merging trial configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args, &parameters)?;

    let defaults = ShowerSettings::default();
    let mut engine = ShowerEngine::new(ShowerSettings {
        seed: config.simulation.seed.unwrap_or(defaults.seed),
        scratch: config.scratch.clone(),
        ..defaults
    });

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting trial: {} event(s) for each of {} particle categor{}...",
        config.simulation.num_events,
        config.simulation.categories.len(),
        if config.simulation.categories.len() == 1 { "y" } else { "ies" }
    );
    info!("Invoking the core trial workflow...");

    let report = tokio::task::block_in_place(|| {
        workflows::trial::run(&parameters, &mut engine, &config, &reporter)
    })?;

    println!(
        "✓ {} row(s) from {} layer(s) written to: {}",
        report.num_rows,
        report.geometry.len(),
        report.output_path.display()
    );
    if report.purged_files > 0 {
        println!("  Purged {} scratch file(s).", report.purged_files);
    }
    match report.penalty {
        Some(penalty) => println!("  Budget penalty: {:.6}", penalty),
        None => println!("  Budget penalty: not evaluated (no layer topology)"),
    }

    Ok(())
}
