//! Celio's stochastic approximation of the polarization.
//!
//! Each realization propagates one random product state (probe polarized,
//! bath factors random) through the whole time grid, and the mean over
//! realizations converges to the mixed-bath expectation value.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Distribution;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    distribution::{BathSampling, RandomProductState},
    error::{Result, SolverError},
    hamiltonian::Hamiltonian,
    solvers::{Plan, PolarizationMeasurement, Propagator, Solver},
    trajectory::{Trajectory, TrajectoryAccumulator},
};

/// Everything shared, read-only, between the realizations of one solve.
pub struct StochasticEstimator<P> {
    plan: Plan<P>,
    measurement: PolarizationMeasurement,
    distribution: RandomProductState,
    times: Vec<f64>,
}

impl<P: Propagator> StochasticEstimator<P> {
    /// # Errors
    ///
    /// Fails with `InvalidParameter` for `trotter_steps == 0` or an invalid
    /// time grid, and if a propagator cannot be built.
    pub fn new<S: Solver<Propagator = P>>(
        solver: &S,
        hamiltonian: &Hamiltonian,
        times: &[f64],
        trotter_steps: usize,
        sampling: BathSampling,
    ) -> Result<Self> {
        let plan = solver.plan(hamiltonian, times, trotter_steps)?;
        Ok(Self {
            plan,
            measurement: PolarizationMeasurement::new(hamiltonian.dims()),
            distribution: RandomProductState::new(hamiltonian.dims(), sampling),
            times: times.to_vec(),
        })
    }

    /// One trajectory from a single random initial state.
    pub fn realization<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let initial = self.distribution.sample(rng);
        self.plan.solve(&initial, &self.measurement)
    }

    fn finish(&self, accumulator: &TrajectoryAccumulator) -> Result<Trajectory> {
        let mean = accumulator
            .mean()
            .ok_or_else(|| SolverError::numerical("no realizations were accumulated"))?;
        if let Some(i) = mean.polarization().iter().position(|p| !p.is_finite()) {
            return Err(SolverError::numerical(format!(
                "non-finite polarization at t = {}",
                self.times[i]
            )));
        }
        Ok(mean)
    }

    fn check_count(n_realizations: usize) -> Result<()> {
        if n_realizations == 0 {
            return Err(SolverError::invalid_parameter(
                "n_realizations",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Mean of `n_realizations` trajectories, realization `i` using
    /// `StdRng::seed_from_u64(seed + i)`.
    ///
    /// The same seed gives the same result, serial or parallel, up to
    /// the order of the floating point sum.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameter` for `n_realizations == 0`, and with
    /// `Numerical` if the propagation produced non-finite values.
    pub fn average(
        &self,
        n_realizations: usize,
        seed: Option<u64>,
        parallel: bool,
    ) -> Result<Trajectory> {
        Self::check_count(n_realizations)?;
        let base = seed.unwrap_or_else(|| rand::thread_rng().gen());
        debug!(n_realizations, base_seed = base, parallel, "Averaging realizations");

        let run = |mut accumulator: TrajectoryAccumulator, i: usize| {
            let mut rng = StdRng::seed_from_u64(base.wrapping_add(i as u64));
            accumulator.add(&self.realization(&mut rng));
            accumulator
        };
        let accumulator = if parallel {
            (0..n_realizations)
                .into_par_iter()
                .fold(|| TrajectoryAccumulator::new(&self.times), run)
                .reduce(
                    || TrajectoryAccumulator::new(&self.times),
                    TrajectoryAccumulator::merge,
                )
        } else {
            (0..n_realizations).fold(TrajectoryAccumulator::new(&self.times), run)
        };
        self.finish(&accumulator)
    }

    /// Mean of `n_realizations` trajectories drawn serially from `rng`.
    ///
    /// # Errors
    ///
    /// As for [`StochasticEstimator::average`].
    pub fn average_with_rng<R: Rng + ?Sized>(
        &self,
        n_realizations: usize,
        rng: &mut R,
    ) -> Result<Trajectory> {
        Self::check_count(n_realizations)?;
        let mut accumulator = TrajectoryAccumulator::new(&self.times);
        for _ in 0..n_realizations {
            accumulator.add(&self.realization(rng));
        }
        self.finish(&accumulator)
    }
}
