use ndarray::Array1;
use num_complex::Complex;
use tracing::debug;

use crate::{
    embedding::{EmbeddedOperator, Tensor},
    error::{Result, SolverError},
    hamiltonian::Hamiltonian,
    particle::Spin,
    spin::SpinMatrices,
    trajectory::validate_times,
};

/// Relative tolerance under which two sub-step sizes share a propagator.
const STEP_TOLERANCE: f64 = 1e-10;

pub trait Measurement {
    type Out;
    fn measure(&self, state: &Array1<Complex<f64>>) -> Self::Out;
}

pub struct OperatorMeasurement<T> {
    pub operator: T,
}

impl<T: Tensor> Measurement for OperatorMeasurement<T> {
    type Out = Complex<f64>;
    fn measure(&self, state: &Array1<Complex<f64>>) -> Self::Out {
        let conj_state = state.map(num_complex::Complex::conj);
        conj_state.dot(&self.operator.dot(state))
    }
}

/// `<S_z> / I` of the probe (site 0), for a normalised state.
pub struct PolarizationMeasurement(OperatorMeasurement<EmbeddedOperator>);

impl PolarizationMeasurement {
    /// # Panics
    ///
    /// Will panic if `dims` is empty or the probe dimension is 1
    #[must_use]
    pub fn new(dims: &[usize]) -> Self {
        assert!(dims[0] > 1, "the probe must have a non-zero spin");
        #[allow(clippy::cast_possible_truncation)]
        let spin = Spin::from_halves(dims[0] as u32 - 1);
        let sz = SpinMatrices::new(spin).sz.mapv(|x| x / spin.value());
        Self(OperatorMeasurement {
            operator: EmbeddedOperator::new(dims, &[0], sz),
        })
    }
}

impl Measurement for PolarizationMeasurement {
    type Out = f64;
    fn measure(&self, state: &Array1<Complex<f64>>) -> Self::Out {
        self.0.measure(state).re
    }
}

/// A fixed short-time evolution operator.
pub trait Propagator: Send + Sync {
    /// Advance `state` by one step, in place.
    fn step(&self, state: &mut Array1<Complex<f64>>);

    fn integrate(&self, state: &mut Array1<Complex<f64>>, n_step: usize) {
        for _n in 0..n_step {
            self.step(state);
        }
    }
}

/// Builds short-time propagators for a Hamiltonian.
pub trait Solver {
    type Propagator: Propagator;

    /// The propagator for a single step of length `dt` (s).
    ///
    /// # Errors
    ///
    /// Fails if a local diagonalisation fails.
    fn propagator(&self, hamiltonian: &Hamiltonian, dt: f64) -> Result<Self::Propagator>;

    /// Prepare the propagators needed to visit every entry of `times`,
    /// taking `trotter_steps` steps per interval (including `0 -> times[0]`).
    ///
    /// One propagator is built per distinct interval length.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameter` for `trotter_steps == 0` or an invalid grid.
    #[allow(clippy::cast_precision_loss)]
    fn plan(
        &self,
        hamiltonian: &Hamiltonian,
        times: &[f64],
        trotter_steps: usize,
    ) -> Result<Plan<Self::Propagator>> {
        if trotter_steps == 0 {
            return Err(SolverError::invalid_parameter(
                "trotter_steps",
                "must be at least 1",
            ));
        }
        validate_times(times)?;

        let mut step_sizes = Vec::<f64>::new();
        let mut propagators = Vec::new();
        let mut schedule = Vec::with_capacity(times.len());
        let mut previous = 0f64;
        for t in times {
            let interval = t - previous;
            previous = *t;
            if interval == 0.0 {
                schedule.push(None);
                continue;
            }
            let dt = interval / trotter_steps as f64;
            let index = match step_sizes
                .iter()
                .position(|s| (s - dt).abs() <= STEP_TOLERANCE * s)
            {
                Some(index) => index,
                None => {
                    propagators.push(self.propagator(hamiltonian, dt)?);
                    step_sizes.push(dt);
                    step_sizes.len() - 1
                }
            };
            schedule.push(Some(index));
        }
        debug!(
            n_times = times.len(),
            n_propagators = propagators.len(),
            trotter_steps,
            "Prepared propagation plan"
        );

        Ok(Plan {
            propagators,
            schedule,
            trotter_steps,
        })
    }

    /// Propagate `initial_state` over `times`, measuring at every entry.
    ///
    /// # Errors
    ///
    /// Fails if the plan cannot be built.
    fn solve<M: Measurement>(
        &self,
        initial_state: &Array1<Complex<f64>>,
        hamiltonian: &Hamiltonian,
        measurement: &M,
        times: &[f64],
        trotter_steps: usize,
    ) -> Result<Vec<M::Out>> {
        Ok(self
            .plan(hamiltonian, times, trotter_steps)?
            .solve(initial_state, measurement))
    }
}

/// The propagators and step schedule for one time grid.
///
/// A plan is read-only once built and can be shared between threads.
pub struct Plan<P> {
    propagators: Vec<P>,
    /// Propagator used for the interval ending at each time, `None` for a repeated time
    schedule: Vec<Option<usize>>,
    trotter_steps: usize,
}

impl<P: Propagator> Plan<P> {
    #[must_use]
    pub fn n_propagators(&self) -> usize {
        self.propagators.len()
    }

    /// Advance monotonically through the grid in a single pass.
    pub fn solve<M: Measurement>(
        &self,
        initial_state: &Array1<Complex<f64>>,
        measurement: &M,
    ) -> Vec<M::Out> {
        let mut out = Vec::with_capacity(self.schedule.len());
        let mut current = initial_state.to_owned();
        for entry in &self.schedule {
            if let Some(index) = entry {
                self.propagators[*index].integrate(&mut current, self.trotter_steps);
            }
            out.push(measurement.measure(&current));
        }
        out
    }
}
