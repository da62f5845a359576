use super::error::EngineError;
use super::scratch::ScratchDir;
use super::session::SimulationEngine;
use crate::core::geometry::Geometry;
use crate::core::table::{Column, JaggedArray, ResultTable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Exp1, StandardNormal};
use serde::Serialize;
use std::f64::consts::PI;
use std::fs;
use std::str::FromStr;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Longitudinal scale parameter `b` of electromagnetic showers (per radiation length).
const EM_PROFILE_B: f64 = 0.5;
/// Longitudinal scale parameter `b` of hadronic showers (per interaction length).
const HADRONIC_PROFILE_B: f64 = 1.0;
/// Mean conversion depth of a photon, in radiation lengths.
const PHOTON_CONVERSION_X0: f64 = 9.0 / 7.0;
/// Visible fraction of hadronic energy relative to electromagnetic energy.
const HADRONIC_RESPONSE: f64 = 0.8;
const MIN_SIMPSON_INTERVALS: usize = 16;
const MAX_SIMPSON_INTERVALS: usize = 8192;
/// Simpson intervals per unit of scaled depth `b * t`.
const SIMPSON_INTERVALS_PER_UNIT: f64 = 32.0;

pub const COLUMN_TRUE_ENERGY: &str = "true_energy";
pub const COLUMN_SENSOR_ENERGY_SUM: &str = "sensor_energy_sum";
pub const COLUMN_NUM_HITS: &str = "num_hits";
pub const COLUMN_HIT_ENERGY: &str = "hit_energy";
pub const COLUMN_HIT_LAYER: &str = "hit_layer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Particle {
    Electron,
    Positron,
    Photon,
    PiPlus,
    PiMinus,
    Proton,
    Neutron,
}

impl Particle {
    pub fn is_electromagnetic(self) -> bool {
        matches!(self, Particle::Electron | Particle::Positron | Particle::Photon)
    }

    /// The constant `C` in `a = 1 + b (ln(E / Ec) + C)`.
    fn profile_offset(self) -> f64 {
        match self {
            Particle::Electron | Particle::Positron => -0.5,
            Particle::Photon => 0.5,
            _ => 0.0,
        }
    }
}

impl FromStr for Particle {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "e-" => Ok(Particle::Electron),
            "e+" => Ok(Particle::Positron),
            "gamma" => Ok(Particle::Photon),
            "pi+" => Ok(Particle::PiPlus),
            "pi-" => Ok(Particle::PiMinus),
            "proton" => Ok(Particle::Proton),
            "neutron" => Ok(Particle::Neutron),
            _ => Err(EngineError::UnknownParticle(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowerSettings {
    pub seed: u64,
    /// Stochastic term `s` of the resolution `sigma / E = s / sqrt(E)`, E in GeV.
    pub stochastic_term: f64,
    /// Minimum deposit in GeV for a sensor segment to be recorded as a hit.
    pub hit_threshold: f64,
    /// Where per-batch cache files are written, if anywhere.
    pub scratch: Option<ScratchDir>,
    pub verbosity: u8,
}

impl Default for ShowerSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            stochastic_term: 0.1,
            hit_threshold: 1e-3,
            scratch: None,
            verbosity: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Depth {
    x0: f64,
    lambda: f64,
}

#[derive(Debug, Clone)]
struct Segment {
    layer: usize,
    start: Depth,
    end: Depth,
    sensitive: bool,
}

#[derive(Debug, Default)]
struct EventRecord {
    energy: f64,
    sensor_sum: f64,
    hit_energy: Vec<f64>,
    hit_layer: Vec<f64>,
}

#[derive(Serialize)]
struct BatchSummary<'a> {
    batch: u64,
    particle: &'a str,
    num_events: usize,
    energy_min: f64,
    energy_max: f64,
    mean_sensor_energy: f64,
}

/// A parametric sampling-calorimeter simulation.
///
/// Each primary deposits energy along a gamma-distribution longitudinal profile,
/// measured in radiation lengths for electromagnetic particles and in interaction
/// lengths for hadrons. Only sensitive layers are read out. Every event draws its
/// energy, shower start and response fluctuation from its own generator, seeded from
/// the engine seed, the batch index and the event index, so results do not depend on
/// how events are scheduled across threads.
#[derive(Debug)]
pub struct ShowerEngine {
    settings: ShowerSettings,
    seed: u64,
    verbosity: u8,
    segments: Vec<Segment>,
    critical_energy_gev: f64,
    batch_index: u64,
    active: bool,
}

impl Default for ShowerEngine {
    fn default() -> Self {
        Self::new(ShowerSettings::default())
    }
}

impl ShowerEngine {
    pub fn new(settings: ShowerSettings) -> Self {
        Self {
            seed: settings.seed,
            verbosity: settings.verbosity,
            settings,
            segments: Vec::new(),
            critical_energy_gev: 0.0,
            batch_index: 0,
            active: false,
        }
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn is_initialized(&self) -> bool {
        self.active
    }

    fn simulate_event(
        &self,
        particle: Particle,
        energy_min: f64,
        energy_max: f64,
        batch: u64,
        event: u64,
    ) -> EventRecord {
        let mut rng = StdRng::seed_from_u64(event_seed(self.seed, batch, event));
        let energy = if energy_min < energy_max {
            rng.gen_range(energy_min..=energy_max)
        } else {
            energy_min
        };

        let (b, a, start) = if particle.is_electromagnetic() {
            let log_ratio = (energy / self.critical_energy_gev).ln();
            let a = 1.0 + EM_PROFILE_B * (log_ratio + particle.profile_offset());
            let start = match particle {
                Particle::Photon => PHOTON_CONVERSION_X0 * rng.sample::<f64, _>(Exp1),
                _ => 0.0,
            };
            (EM_PROFILE_B, a, start)
        } else {
            let t_max = 0.2 * energy.ln() + 0.7;
            let a = 1.0 + HADRONIC_PROFILE_B * t_max;
            (HADRONIC_PROFILE_B, a, rng.sample::<f64, _>(Exp1))
        };
        let profile = GammaProfile::new(a.max(1.0), b);

        let z: f64 = rng.sample(StandardNormal);
        let resolution = self.settings.stochastic_term / energy.sqrt();
        let mut response = (1.0 + resolution * z).max(0.0);
        if !particle.is_electromagnetic() {
            response *= HADRONIC_RESPONSE;
        }

        let mut record = EventRecord {
            energy,
            ..EventRecord::default()
        };
        for segment in self.segments.iter().filter(|s| s.sensitive) {
            let (lo, hi) = if particle.is_electromagnetic() {
                (segment.start.x0, segment.end.x0)
            } else {
                (segment.start.lambda, segment.end.lambda)
            };
            let fraction = profile.fraction((lo - start).max(0.0), (hi - start).max(0.0));
            let deposit = energy * response * fraction;
            record.sensor_sum += deposit;
            if deposit > self.settings.hit_threshold {
                record.hit_energy.push(deposit);
                record.hit_layer.push(segment.layer as f64);
            }
        }
        record
    }

    fn write_scratch(&self, summary: &BatchSummary) -> Result<(), EngineError> {
        let Some(scratch) = &self.settings.scratch else {
            return Ok(());
        };
        let path = scratch.file_path(&format!("batch_{:04}", summary.batch));
        let scratch_error = |source: std::io::Error| EngineError::Scratch {
            path: path.display().to_string(),
            source,
        };
        let contents = serde_json::to_vec(summary).map_err(|e| scratch_error(e.into()))?;
        fs::write(&path, contents).map_err(scratch_error)?;
        Ok(())
    }
}

impl SimulationEngine for ShowerEngine {
    fn initialize(&mut self, geometry: &Geometry) -> Result<(), EngineError> {
        if geometry.is_empty() {
            return Err(EngineError::Initialization("geometry has no layers".into()));
        }

        let mut segments = Vec::new();
        let mut depth = Depth::default();
        let mut weighted_critical_energy = 0.0;

        for (index, layer) in geometry.layers().iter().enumerate() {
            if !(layer.thickness.is_finite() && layer.thickness > 0.0) {
                return Err(EngineError::Initialization(format!(
                    "layer {} has non-positive thickness {}",
                    index, layer.thickness
                )));
            }
            if layer.segmentation == 0 {
                return Err(EngineError::Initialization(format!(
                    "layer {} has zero segmentation",
                    index
                )));
            }
            let properties = layer
                .material
                .properties()
                .ok_or_else(|| EngineError::UnknownMaterial {
                    layer: index,
                    material: layer.material.name().to_string(),
                })?;

            let step = layer.thickness / layer.segmentation as f64;
            for _ in 0..layer.segmentation {
                let end = Depth {
                    x0: depth.x0 + step / properties.radiation_length_cm,
                    lambda: depth.lambda + step / properties.interaction_length_cm,
                };
                segments.push(Segment {
                    layer: index,
                    start: depth,
                    end,
                    sensitive: layer.role.is_sensitive(),
                });
                depth = end;
            }
            weighted_critical_energy +=
                layer.thickness / properties.radiation_length_cm * properties.critical_energy_mev;
        }

        if let Some(scratch) = &self.settings.scratch {
            scratch.ensure()?;
        }

        self.critical_energy_gev = weighted_critical_energy / depth.x0 / 1000.0;
        self.segments = segments;
        self.batch_index = 0;
        self.active = true;
        info!(
            layers = geometry.len(),
            segments = self.segments.len(),
            depth_x0 = depth.x0,
            depth_lambda = depth.lambda,
            "Shower engine initialized."
        );
        Ok(())
    }

    fn set_quiet_mode(&mut self) {
        self.verbosity = 0;
    }

    fn run_batch(
        &mut self,
        num_events: usize,
        particle: &str,
        energy_min: f64,
        energy_max: f64,
    ) -> Result<ResultTable, EngineError> {
        if !self.active {
            return Err(EngineError::NotInitialized);
        }
        let species = Particle::from_str(particle)?;
        let valid_range = energy_min.is_finite()
            && energy_max.is_finite()
            && energy_min > 0.0
            && energy_min <= energy_max;
        if !valid_range {
            return Err(EngineError::InvalidEnergyRange {
                min: energy_min,
                max: energy_max,
            });
        }
        let batch = self.batch_index;
        self.batch_index += 1;

        let engine = &*self;

        #[cfg(not(feature = "parallel"))]
        let iterator = 0..num_events as u64;

        #[cfg(feature = "parallel")]
        let iterator = (0..num_events as u64).into_par_iter();

        let events: Vec<EventRecord> = iterator
            .map(|event| engine.simulate_event(species, energy_min, energy_max, batch, event))
            .collect();

        let table = events_to_table(&events)?;
        let mean_sensor_energy = if events.is_empty() {
            0.0
        } else {
            events.iter().map(|e| e.sensor_sum).sum::<f64>() / events.len() as f64
        };

        if self.verbosity > 0 {
            debug!(batch, particle, num_events, mean_sensor_energy, "Shower batch simulated.");
        }
        self.write_scratch(&BatchSummary {
            batch,
            particle,
            num_events,
            energy_min,
            energy_max,
            mean_sensor_energy,
        })?;
        Ok(table)
    }

    fn reset(&mut self) {
        self.segments.clear();
        self.critical_energy_gev = 0.0;
        self.batch_index = 0;
        self.active = false;
        self.seed = self.settings.seed;
        self.verbosity = self.settings.verbosity;
    }

    fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }
}

fn events_to_table(events: &[EventRecord]) -> Result<ResultTable, EngineError> {
    let hit_energy: Vec<&[f64]> = events.iter().map(|e| e.hit_energy.as_slice()).collect();
    let hit_layer: Vec<&[f64]> = events.iter().map(|e| e.hit_layer.as_slice()).collect();
    Ok(ResultTable::new()
        .with_column(
            COLUMN_TRUE_ENERGY,
            Column::Float64(events.iter().map(|e| e.energy).collect()),
        )?
        .with_column(
            COLUMN_SENSOR_ENERGY_SUM,
            Column::Float64(events.iter().map(|e| e.sensor_sum).collect()),
        )?
        .with_column(
            COLUMN_NUM_HITS,
            Column::Int64(events.iter().map(|e| e.hit_energy.len() as i64).collect()),
        )?
        .with_column(COLUMN_HIT_ENERGY, Column::Jagged(JaggedArray::from_rows(&hit_energy)))?
        .with_column(COLUMN_HIT_LAYER, Column::Jagged(JaggedArray::from_rows(&hit_layer)))?)
}

/// Normalized gamma-distribution profile `b (bt)^(a-1) e^(-bt) / Gamma(a)`.
#[derive(Debug, Clone, Copy)]
struct GammaProfile {
    a: f64,
    b: f64,
    ln_norm: f64,
}

impl GammaProfile {
    fn new(a: f64, b: f64) -> Self {
        Self {
            a,
            b,
            ln_norm: b.ln() - ln_gamma(a),
        }
    }

    fn density(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return if self.a == 1.0 { self.b } else { 0.0 };
        }
        let bt = self.b * t;
        ((self.a - 1.0) * bt.ln() - bt + self.ln_norm).exp()
    }

    /// Fraction of the shower energy deposited between depths `lo` and `hi` (Simpson's rule).
    fn fraction(&self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return 0.0;
        }
        let wanted = ((hi - lo) * self.b * SIMPSON_INTERVALS_PER_UNIT).ceil() as usize;
        let n = wanted.clamp(MIN_SIMPSON_INTERVALS, MAX_SIMPSON_INTERVALS) & !1;
        let h = (hi - lo) / n as f64;
        let interior: f64 = (1..n)
            .map(|i| {
                let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
                weight * self.density(lo + i as f64 * h)
            })
            .sum();
        (h / 3.0) * (self.density(lo) + interior + self.density(hi))
    }
}

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// Natural log of the gamma function (Lanczos approximation), for `x >= 1`.
fn ln_gamma(x: f64) -> f64 {
    let x = x - 1.0;
    let sum = LANCZOS_COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS_COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64));
    let t = x + LANCZOS_G + 0.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

fn event_seed(seed: u64, batch: u64, event: u64) -> u64 {
    splitmix64(splitmix64(seed ^ batch.rotate_left(32)) ^ event)
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Layer;
    use crate::engine::scratch::SHOWER_CACHE_EXTENSION;
    use tempfile::tempdir;

    fn sandwich(blocks: usize) -> Geometry {
        let mut geometry = Geometry::new();
        for _ in 0..blocks {
            geometry.push(Layer::absorber(1.0, "G4_Pb"));
            geometry.push(Layer::sensitive(0.5, "G4_PbWO4"));
        }
        geometry
    }

    fn homogeneous() -> Geometry {
        Geometry::from(vec![Layer::sensitive(60.0, "G4_PbWO4").with_segmentation(30)])
    }

    fn noiseless() -> ShowerSettings {
        ShowerSettings {
            stochastic_term: 0.0,
            ..ShowerSettings::default()
        }
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        assert!(ln_gamma(1.0).abs() < 1e-12);
        assert!((ln_gamma(5.0) - 24.0f64.ln()).abs() < 1e-12);
        assert!((ln_gamma(1.5) - (PI.sqrt() / 2.0).ln()).abs() < 1e-10);
    }

    #[test]
    fn gamma_profile_integrates_to_one() {
        let profile = GammaProfile::new(4.2, 0.5);
        let total = profile.fraction(0.0, 200.0);
        assert!((total - 1.0).abs() < 1e-5, "integral was {}", total);
    }

    #[test]
    fn gamma_profile_splits_additively() {
        let profile = GammaProfile::new(4.2, 0.5);
        let whole = profile.fraction(0.0, 30.0);
        let parts = profile.fraction(0.0, 7.5) + profile.fraction(7.5, 30.0);
        assert!((whole - parts).abs() < 1e-6, "{} vs {}", whole, parts);
    }

    #[test]
    fn initialize_rejects_invalid_geometries() {
        let mut engine = ShowerEngine::default();
        assert!(matches!(
            engine.initialize(&Geometry::new()),
            Err(EngineError::Initialization(_))
        ));
        assert!(matches!(
            engine.initialize(&Geometry::from(vec![Layer::absorber(1.0, "Unobtainium")])),
            Err(EngineError::UnknownMaterial { layer: 0, .. })
        ));
        assert!(matches!(
            engine.initialize(&Geometry::from(vec![Layer::absorber(0.0, "G4_Pb")])),
            Err(EngineError::Initialization(_))
        ));
        assert!(!engine.is_initialized());
    }

    #[test]
    fn run_batch_requires_initialization_and_known_particles() {
        let mut engine = ShowerEngine::default();
        assert!(matches!(
            engine.run_batch(1, "e-", 1.0, 2.0),
            Err(EngineError::NotInitialized)
        ));
        engine.initialize(&sandwich(2)).unwrap();
        assert!(matches!(
            engine.run_batch(1, "muon", 1.0, 2.0),
            Err(EngineError::UnknownParticle(p)) if p == "muon"
        ));
        assert!(matches!(
            engine.run_batch(1, "e-", 0.0, 2.0),
            Err(EngineError::InvalidEnergyRange { .. })
        ));
    }

    #[test]
    fn batch_has_one_row_per_event_and_consistent_hits() {
        let mut engine = ShowerEngine::default();
        engine.initialize(&sandwich(10)).unwrap();
        let table = engine.run_batch(50, "e-", 1.0, 50.0).unwrap();

        assert_eq!(table.num_rows(), 50);
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec![
                COLUMN_TRUE_ENERGY,
                COLUMN_SENSOR_ENERGY_SUM,
                COLUMN_NUM_HITS,
                COLUMN_HIT_ENERGY,
                COLUMN_HIT_LAYER
            ]
        );
        let Some(Column::Float64(energies)) = table.column(COLUMN_TRUE_ENERGY) else {
            panic!("missing energies");
        };
        assert!(energies.iter().all(|&e| (1.0..=50.0).contains(&e)));

        let Some(Column::Int64(num_hits)) = table.column(COLUMN_NUM_HITS) else {
            panic!("missing hit counts");
        };
        let Some(Column::Jagged(hits)) = table.column(COLUMN_HIT_LAYER) else {
            panic!("missing hit layers");
        };
        assert!(hits.validate(50).is_ok());
        for (row, layers) in hits.to_rows().iter().enumerate() {
            assert_eq!(num_hits[row] as usize, layers.len());
            // Only sensitive layers, which sit at odd positions, are read out.
            assert!(layers.iter().all(|&l| l as usize % 2 == 1));
        }
    }

    #[test]
    fn homogeneous_calorimeter_contains_electron_showers() {
        let mut engine = ShowerEngine::new(noiseless());
        engine.initialize(&homogeneous()).unwrap();
        let table = engine.run_batch(5, "e-", 10.0, 10.0).unwrap();
        let Some(Column::Float64(sums)) = table.column(COLUMN_SENSOR_ENERGY_SUM) else {
            panic!("missing sums");
        };
        for &sum in sums {
            assert!((sum - 10.0).abs() < 0.1, "visible energy {}", sum);
        }
    }

    #[test]
    fn sampling_calorimeter_sees_only_part_of_the_energy() {
        let mut engine = ShowerEngine::new(noiseless());
        engine.initialize(&sandwich(20)).unwrap();
        let table = engine.run_batch(5, "e-", 20.0, 20.0).unwrap();
        let Some(Column::Float64(sums)) = table.column(COLUMN_SENSOR_ENERGY_SUM) else {
            panic!("missing sums");
        };
        assert!(sums.iter().all(|&s| s > 0.0 && s < 20.0));
    }

    #[test]
    fn batches_are_reproducible_for_a_seed() {
        let run = |seed: u64| {
            let mut engine = ShowerEngine::default();
            engine.set_seed(seed);
            engine.initialize(&sandwich(5)).unwrap();
            engine.run_batch(20, "pi+", 1.0, 50.0).unwrap()
        };
        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }

    #[test]
    fn consecutive_batches_differ() {
        let mut engine = ShowerEngine::default();
        engine.initialize(&sandwich(5)).unwrap();
        let first = engine.run_batch(10, "gamma", 1.0, 50.0).unwrap();
        let second = engine.run_batch(10, "gamma", 1.0, 50.0).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn quiet_mode_is_undone_by_reset() {
        let mut engine = ShowerEngine::default();
        engine.set_quiet_mode();
        assert_eq!(engine.verbosity(), 0);
        engine.reset();
        assert_eq!(engine.verbosity(), 1);
    }

    #[test]
    fn each_batch_leaves_a_scratch_file() {
        let dir = tempdir().unwrap();
        let scratch = ScratchDir::new(dir.path().join("scratch"), SHOWER_CACHE_EXTENSION);
        let mut engine = ShowerEngine::new(ShowerSettings {
            scratch: Some(scratch.clone()),
            ..ShowerSettings::default()
        });
        engine.initialize(&sandwich(3)).unwrap();
        engine.run_batch(4, "e-", 1.0, 5.0).unwrap();
        engine.run_batch(4, "pi+", 1.0, 5.0).unwrap();

        assert!(scratch.file_path("batch_0000").exists());
        assert!(scratch.file_path("batch_0001").exists());
        assert_eq!(scratch.purge().unwrap(), 2);
    }
}
