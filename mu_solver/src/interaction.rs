use std::time::Instant;

use rand::Rng;
use rayon::prelude::*;
use tracing::{info, level_filters::LevelFilter, warn, Level};

use crate::{
    config::SimulationConfig,
    error::{Result, SolverError},
    geometry::{Rotation, Vector3},
    hamiltonian::Hamiltonian,
    logging,
    particle::Particle,
    solvers::{
        exact::{self, InitialDensity},
        TrotterPropagator, TrotterSolver,
    },
    stochastic::StochasticEstimator,
    system::SpinSystem,
    trajectory::{validate_times, Trajectory},
};

/// A muon and its nuclear neighbours, ready to be solved exactly or with
/// Celio's approximation.
///
/// Every instance owns its particles, field and configuration, so separate
/// instances can be used from separate threads.
#[derive(Clone, Debug)]
pub struct MuonNuclearInteraction {
    system: SpinSystem,
    config: SimulationConfig,
    log_level: LevelFilter,
}

impl MuonNuclearInteraction {
    /// `particles[0]` is the muon, `external_field` is in T.
    ///
    /// # Errors
    ///
    /// Fails if the particles do not form a valid [`SpinSystem`].
    pub fn new(particles: Vec<Particle>, external_field: Vector3) -> Result<Self> {
        Ok(Self {
            system: SpinSystem::new(particles, external_field)?,
            config: SimulationConfig::default(),
            log_level: LevelFilter::WARN,
        })
    }

    /// # Errors
    ///
    /// Fails with `InvalidParameter` if `config` is invalid.
    pub fn with_config(self, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, ..self })
    }

    /// Events below `log_level` are not emitted by this instance.
    #[must_use]
    pub fn with_log_level(self, log_level: LevelFilter) -> Self {
        Self { log_level, ..self }
    }

    #[must_use]
    pub fn system(&self) -> &SpinSystem {
        &self.system
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// # Errors
    ///
    /// Fails with `InvalidParameter` if `field` is not finite.
    pub fn set_external_field(&mut self, field: Vector3) -> Result<()> {
        self.system.set_field(field)
    }

    /// Move the muon to the origin and rotate the sample so that `axis`
    /// becomes the quantization (and polarization) axis z.
    ///
    /// The external field keeps its components, now read in the aligned frame.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidGeometry` if `axis` is degenerate.
    pub fn apply_rotation(&mut self, axis: Vector3) -> Result<()> {
        self.system = self.system.aligned_to(axis)?;
        Ok(())
    }

    /// Rotate every position and field gradient of the sample.
    pub fn rotate(&mut self, rotation: &Rotation) {
        self.system = self.system.rotated(rotation);
    }

    /// # Errors
    ///
    /// Fails with `InvalidParameter` for a non-positive cutoff.
    pub fn hamiltonian(&self, cutoff: Option<f64>) -> Result<Hamiltonian> {
        Hamiltonian::build(&self.system, cutoff)
    }

    fn check_range(&self, trajectory: &Trajectory) {
        if self.log_level < Level::WARN {
            return;
        }
        let tolerance = self.config.polarization_tolerance;
        for (i, p) in trajectory.out_of_range(tolerance) {
            warn!(
                time = trajectory.times()[i],
                polarization = p,
                tolerance,
                "Polarization outside [-1, 1]"
            );
        }
    }

    /// Exact polarization, leaving out dipolar pairs further apart than `cutoff` (m).
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameter` for an invalid grid or cutoff, and with
    /// `ResourceExhaustion` if the system is too large to diagonalise.
    pub fn solve_exact(&self, times: &[f64], cutoff: Option<f64>) -> Result<Trajectory> {
        logging::with_level(self.log_level, || self.solve_exact_inner(times, cutoff))
    }

    fn solve_exact_inner(&self, times: &[f64], cutoff: Option<f64>) -> Result<Trajectory> {
        let start = Instant::now();
        validate_times(times)?;
        let dimension = self.system.dimension();
        if dimension > self.config.max_exact_dimension {
            return Err(SolverError::ResourceExhaustion {
                dimension,
                limit: self.config.max_exact_dimension,
            });
        }

        let hamiltonian = self.hamiltonian(cutoff)?;
        info!(
            dimension,
            n_terms = hamiltonian.terms().len(),
            n_times = times.len(),
            "Starting exact solve"
        );
        let trajectory = exact::solve_exact(
            &hamiltonian,
            &InitialDensity::PolarizedProbe,
            times,
            &self.config,
        )?;
        info!(elapsed = ?start.elapsed(), "Finished exact solve");
        self.check_range(&trajectory);
        Ok(trajectory)
    }

    fn estimator(
        &self,
        system: &SpinSystem,
        times: &[f64],
        trotter_steps: usize,
    ) -> Result<StochasticEstimator<TrotterPropagator>> {
        let hamiltonian = Hamiltonian::build(system, None)?;
        info!(
            dimension = hamiltonian.dimension(),
            n_terms = hamiltonian.terms().len(),
            trotter_steps,
            n_realizations = self.config.n_realizations,
            "Starting stochastic solve"
        );
        let solver = TrotterSolver {
            splitting: self.config.splitting,
        };
        StochasticEstimator::new(
            &solver,
            &hamiltonian,
            times,
            trotter_steps,
            self.config.bath_sampling,
        )
    }

    /// Celio's approximation with `trotter_steps` steps per output interval,
    /// averaged over `config.n_realizations` random states.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameter` for `trotter_steps == 0` or an invalid grid.
    pub fn solve_stochastic(&self, times: &[f64], trotter_steps: usize) -> Result<Trajectory> {
        logging::with_level(self.log_level, || -> Result<Trajectory> {
            let start = Instant::now();
            let estimator = self.estimator(&self.system, times, trotter_steps)?;
            let trajectory = estimator.average(
                self.config.n_realizations,
                self.config.seed,
                self.config.parallel,
            )?;
            info!(elapsed = ?start.elapsed(), "Finished stochastic solve");
            self.check_range(&trajectory);
            Ok(trajectory)
        })
    }

    /// As [`MuonNuclearInteraction::solve_stochastic`], drawing every random
    /// state from `rng`, serially.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameter` for `trotter_steps == 0` or an invalid grid.
    pub fn solve_stochastic_with_rng<R: Rng + ?Sized>(
        &self,
        times: &[f64],
        trotter_steps: usize,
        rng: &mut R,
    ) -> Result<Trajectory> {
        logging::with_level(self.log_level, || -> Result<Trajectory> {
            let estimator = self.estimator(&self.system, times, trotter_steps)?;
            let trajectory = estimator.average_with_rng(self.config.n_realizations, rng)?;
            self.check_range(&trajectory);
            Ok(trajectory)
        })
    }

    /// The stochastic signal for each field in `fields`, in the same order.
    ///
    /// Fields are solved in parallel when `config.parallel` is set, each one
    /// with the configured seed.
    ///
    /// # Errors
    ///
    /// Fails with the first error of any individual solve.
    pub fn field_scan_stochastic(
        &self,
        fields: &[Vector3],
        times: &[f64],
        trotter_steps: usize,
    ) -> Result<Vec<Trajectory>> {
        let solve = |field: &Vector3| -> Result<Trajectory> {
            logging::with_level(self.log_level, || -> Result<Trajectory> {
                let mut system = self.system.clone();
                system.set_field(*field)?;
                let trajectory = self
                    .estimator(&system, times, trotter_steps)?
                    .average(self.config.n_realizations, self.config.seed, false)?;
                self.check_range(&trajectory);
                Ok(trajectory)
            })
        };
        if self.config.parallel {
            fields.par_iter().map(solve).collect()
        } else {
            fields.iter().map(solve).collect()
        }
    }
}
