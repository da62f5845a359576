use super::config::{Category, EnergyRange, SimulationConfig};
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::session::{EngineSession, SimulationEngine};
use crate::core::geometry::Geometry;
use crate::core::table::{ResultTable, TRUE_LABEL};
use tracing::{info, instrument, warn};

/// Runs one labeled batch per particle category against an open session.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRunner {
    energy_range: EnergyRange,
}

impl BatchRunner {
    pub fn new(energy_range: EnergyRange) -> Self {
        Self { energy_range }
    }

    /// Simulates `num_events` events for every category, in the given order.
    ///
    /// Each sub-table gets a `true_label` column holding the category's numeric label.
    /// Sub-tables are concatenated in category order without reordering rows, and
    /// ragged columns are normalized before the table is returned.
    ///
    /// # Errors
    ///
    /// Engine failures propagate unchanged; nothing is retried. Sub-tables whose
    /// schemas differ, or that already carry a `true_label` column, fail with
    /// [`EngineError::Table`].
    #[instrument(
        skip_all,
        name = "batch_runner",
        fields(num_events = num_events, categories = categories.len())
    )]
    pub fn run<E: SimulationEngine + ?Sized>(
        &self,
        session: &mut EngineSession<'_, E>,
        num_events: usize,
        categories: &[Category],
        reporter: &ProgressReporter,
    ) -> Result<ResultTable, EngineError> {
        reporter.report(Progress::TaskStart {
            total_steps: categories.len() as u64,
        });

        let mut tables = Vec::with_capacity(categories.len());
        for category in categories {
            let table = session.run_batch(
                num_events,
                &category.particle,
                self.energy_range.min,
                self.energy_range.max,
            )?;
            if table.num_rows() != num_events {
                warn!(
                    particle = %category.particle,
                    requested = num_events,
                    returned = table.num_rows(),
                    "Engine returned a different number of events than requested."
                );
            }
            tables.push(table.with_constant_column(TRUE_LABEL, category.label)?);
            reporter.report(Progress::TaskIncrement);
        }

        let combined = ResultTable::concat(tables)?.normalize_ragged()?;
        reporter.report(Progress::TaskFinish);

        info!(
            rows = combined.num_rows(),
            columns = combined.num_columns(),
            "Batches aggregated."
        );
        Ok(combined)
    }
}

/// Opens a session for `geometry`, runs every configured batch and closes the session.
pub fn run_batches<E: SimulationEngine + ?Sized>(
    engine: &mut E,
    geometry: &Geometry,
    config: &SimulationConfig,
    reporter: &ProgressReporter,
) -> Result<ResultTable, EngineError> {
    let mut session = EngineSession::open(engine, geometry)?;
    if let Some(seed) = config.seed {
        session.seed(seed);
    }
    BatchRunner::new(config.energy_range).run(
        &mut session,
        config.num_events,
        &config.categories,
        reporter,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Layer;
    use crate::core::table::{Column, TableError};
    use crate::engine::session::mock::{Call, RecordingEngine};

    fn geometry() -> Geometry {
        Geometry::from(vec![
            Layer::absorber(1.0, "G4_Pb"),
            Layer::sensitive(2.0, "G4_PbWO4"),
        ])
    }

    fn config(categories: Vec<Category>) -> SimulationConfig {
        SimulationConfig {
            num_events: 100,
            energy_range: EnergyRange::default(),
            categories,
            seed: Some(7),
        }
    }

    #[test]
    fn two_categories_concatenate_in_order_with_labels() {
        let mut engine = RecordingEngine::default();
        let categories = vec![Category::new("pi+", 0.211), Category::new("e-", 0.13)];

        let table = run_batches(
            &mut engine,
            &geometry(),
            &config(categories),
            &ProgressReporter::new(),
        )
        .unwrap();

        assert_eq!(table.num_rows(), 200);
        let Some(Column::Float32(labels)) = table.column(TRUE_LABEL) else {
            panic!("missing label column");
        };
        assert!(labels[..100].iter().all(|&l| l == 0.211));
        assert!(labels[100..].iter().all(|&l| l == 0.13));
        assert!(!table.has_ragged_columns());
        assert!(matches!(table.column("hit_energy"), Some(Column::List(_))));

        assert_eq!(
            engine.calls,
            vec![
                Call::Reset,
                Call::Initialize(2),
                Call::Quiet,
                Call::Seed(7),
                Call::Batch(100, "pi+".into()),
                Call::Batch(100, "e-".into()),
                Call::Reset,
            ]
        );
    }

    #[test]
    fn engine_failure_stops_remaining_batches() {
        let mut engine = RecordingEngine::failing_on("pi+");
        let categories = vec![Category::new("pi+", 0.211), Category::new("e-", 0.13)];

        let result = run_batches(
            &mut engine,
            &geometry(),
            &config(categories),
            &ProgressReporter::new(),
        );

        assert!(matches!(result, Err(EngineError::Batch { .. })));
        assert!(!engine.calls.contains(&Call::Batch(100, "e-".into())));
        assert_eq!(engine.calls.last(), Some(&Call::Reset));
    }

    #[test]
    fn empty_geometry_fails_before_any_batch() {
        let mut engine = RecordingEngine::default();
        let result = run_batches(
            &mut engine,
            &Geometry::new(),
            &config(vec![Category::new("pi+", 0.211)]),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Initialization(_))));
        assert!(!engine.calls.iter().any(|c| matches!(c, Call::Batch(..))));
    }

    #[test]
    fn engine_tables_with_a_label_column_are_rejected() {
        struct Labelled;
        impl SimulationEngine for Labelled {
            fn initialize(&mut self, _: &Geometry) -> Result<(), EngineError> {
                Ok(())
            }
            fn set_quiet_mode(&mut self) {}
            fn run_batch(
                &mut self,
                n: usize,
                _: &str,
                _: f64,
                _: f64,
            ) -> Result<ResultTable, EngineError> {
                Ok(ResultTable::new().with_column(TRUE_LABEL, Column::Float32(vec![1.0; n]))?)
            }
            fn reset(&mut self) {}
        }

        let result = run_batches(
            &mut Labelled,
            &geometry(),
            &config(vec![Category::new("pi+", 0.211)]),
            &ProgressReporter::new(),
        );
        assert!(matches!(
            result,
            Err(EngineError::Table(TableError::DuplicateColumn(name))) if name == TRUE_LABEL
        ));
    }
}
