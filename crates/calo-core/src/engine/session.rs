use super::error::EngineError;
use crate::core::geometry::Geometry;
use crate::core::table::ResultTable;
use tracing::{debug, warn};

/// The boundary to a stateful simulation engine holding one geometry at a time.
///
/// Callers should not drive an engine through this trait directly; open an
/// [`EngineSession`] instead, which enforces the initialize / use / reset sequence.
pub trait SimulationEngine {
    /// Builds the engine's detector from `geometry`.
    ///
    /// # Errors
    ///
    /// Fails for geometries the engine cannot realize, such as an empty layer stack or
    /// an unknown material. Such failures are fatal to the trial.
    fn initialize(&mut self, geometry: &Geometry) -> Result<(), EngineError>;

    /// Silences the engine's own verbosity and logging.
    fn set_quiet_mode(&mut self);

    /// Simulates `num_events` primaries of `particle` with energies drawn from
    /// `[energy_min, energy_max]` GeV and returns one row per event.
    fn run_batch(
        &mut self,
        num_events: usize,
        particle: &str,
        energy_min: f64,
        energy_max: f64,
    ) -> Result<ResultTable, EngineError>;

    /// Drops the active geometry and restores the default engine configuration.
    fn reset(&mut self);

    /// Seeds the engine's random number generation. Engines without seeding ignore it.
    fn set_seed(&mut self, _seed: u64) {}
}

/// Scoped ownership of an engine initialized with one geometry.
///
/// Opening a session resets the engine, initializes it with the geometry and switches it
/// to quiet mode. Dropping the session resets the engine again. The session holds the
/// engine's only mutable borrow, so no second geometry can be activated meanwhile.
pub struct EngineSession<'e, E: SimulationEngine + ?Sized> {
    engine: &'e mut E,
    num_layers: usize,
}

impl<'e, E: SimulationEngine + ?Sized> EngineSession<'e, E> {
    pub fn open(engine: &'e mut E, geometry: &Geometry) -> Result<Self, EngineError> {
        engine.reset();
        if let Err(e) = engine.initialize(geometry) {
            warn!(layers = geometry.len(), "Engine initialization failed: {}", e);
            engine.reset();
            return Err(e);
        }
        engine.set_quiet_mode();
        debug!(layers = geometry.len(), "Engine session opened.");
        Ok(Self {
            engine,
            num_layers: geometry.len(),
        })
    }

    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    pub fn seed(&mut self, seed: u64) {
        self.engine.set_seed(seed);
    }

    pub fn run_batch(
        &mut self,
        num_events: usize,
        particle: &str,
        energy_min: f64,
        energy_max: f64,
    ) -> Result<ResultTable, EngineError> {
        self.engine
            .run_batch(num_events, particle, energy_min, energy_max)
    }
}

impl<E: SimulationEngine + ?Sized> Drop for EngineSession<'_, E> {
    fn drop(&mut self) {
        self.engine.reset();
        debug!("Engine session closed.");
    }
}
