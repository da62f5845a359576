use crate::core::constraints::{ConstraintError, PenaltyEvaluator, TensorView};
use crate::core::geometry::{Geometry, build_geometry};
use crate::core::io::parquet::{TableIoError, write_table};
use crate::core::params::{ParameterDictionary, ParameterError};
use crate::engine::batch::run_batches;
use crate::engine::config::RunConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::scratch::ScratchDir;
use crate::engine::session::SimulationEngine;
use candle_core::Device;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum TrialError {
    #[error("Invalid parameters: {0}")]
    Parameter(#[from] ParameterError),
    #[error("Constraint setup failed: {0}")]
    Constraint(#[from] ConstraintError),
    #[error("Simulation failed: {0}")]
    Engine(#[from] EngineError),
    #[error("Failed to persist results: {0}")]
    Persistence(#[from] TableIoError),
}

#[derive(Debug, Clone)]
pub struct TrialReport {
    pub geometry: Geometry,
    pub num_rows: usize,
    pub output_path: PathBuf,
    /// Budget penalty of the dictionary's own values; `None` without a configured topology.
    pub penalty: Option<f64>,
    pub purged_files: usize,
}

/// Runs one complete trial for `parameters`.
///
/// Configuration problems surface before the engine is touched. If the engine or the
/// final write fails, the trial produces no output file and the scratch directory is
/// still purged.
///
/// # Errors
///
/// Returns [`TrialError`] for the first phase that fails.
#[instrument(skip_all, name = "trial_workflow", fields(output = %config.output_path.display()))]
pub fn run<E: SimulationEngine + ?Sized>(
    parameters: &ParameterDictionary,
    engine: &mut E,
    config: &RunConfig,
    reporter: &ProgressReporter,
) -> Result<TrialReport, TrialError> {
    // === Phase 1: Validate parameters against the declared topology ===
    let evaluator = reporter.phase("Validating Parameters", || {
        config
            .topology
            .as_ref()
            .map(|topology| PenaltyEvaluator::new(topology, parameters))
            .transpose()
    })?;

    // === Phase 2: Realize the geometry ===
    let geometry = reporter.phase("Building Geometry", || build_geometry(parameters))?;
    info!(
        layers = geometry.len(),
        total_thickness = geometry.total_thickness(),
        "Geometry realized."
    );

    // === Phase 3: Simulate and persist ===
    let persisted = reporter
        .phase("Simulating", || {
            run_batches(engine, &geometry, &config.simulation, reporter).map_err(TrialError::from)
        })
        .and_then(|table| {
            reporter.phase("Writing Results", || {
                write_table(&table, &config.output_path)?;
                Ok::<_, TrialError>(table.num_rows())
            })
        });
    let num_rows = match persisted {
        Ok(rows) => rows,
        Err(e) => {
            if let Some(scratch) = &config.scratch {
                purge_after_failure(scratch);
            }
            return Err(e);
        }
    };

    // === Phase 4: Clean up engine scratch files ===
    let purged_files = match &config.scratch {
        Some(scratch) => reporter.phase("Purging Scratch", || scratch.purge())?,
        None => 0,
    };

    // === Phase 5: Score the budgets ===
    let penalty = match evaluator {
        Some(evaluator) => {
            let view = TensorView::from_dictionary(parameters, &Device::Cpu)?;
            let breakdown = evaluator.evaluate(&view)?;
            reporter.report(Progress::Message(format!(
                "Length {:.2} / {:.2}, cost {:.2} / {:.2}",
                breakdown.total_length,
                evaluator.max_length(),
                breakdown.total_cost,
                evaluator.max_cost()
            )));
            Some(breakdown.value()?)
        }
        None => None,
    };

    info!(rows = num_rows, purged_files, ?penalty, "Trial complete.");
    Ok(TrialReport {
        geometry,
        num_rows,
        output_path: config.output_path.clone(),
        penalty,
        purged_files,
    })
}

fn purge_after_failure(scratch: &ScratchDir) {
    match scratch.purge() {
        Ok(removed) => info!(removed, "Scratch purged after failed trial."),
        Err(e) => warn!("Failed to purge scratch after failed trial: {}", e),
    }
}
