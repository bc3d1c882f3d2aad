//! Exact evolution of the density matrix through a full diagonalisation.
//!
//! With `H = U E U^dagger`, `rho~ = U^dagger rho_0 U` and `O~ = U^dagger O U`,
//!
//! ```latex
//! P(t) = Tr[rho(t) O] = \sum_{ab} rho~_{ab} O~_{ba} e^{-i (E_a - E_b) t}
//! ```
//!
//! which costs `O(D^3)` once and `O(D^2)` per time.

use ndarray::{Array1, Array2};
use ndarray_linalg::{Eigh, UPLO};
use num_complex::Complex;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    config::SimulationConfig,
    error::{Result, SolverError},
    hamiltonian::Hamiltonian,
    trajectory::{validate_times, Trajectory},
};

/// The state the probe and bath start in.
#[derive(Clone, Debug, Default)]
pub enum InitialDensity {
    /// Probe in `|m = +I>`, bath maximally mixed
    #[default]
    PolarizedProbe,
    /// A caller supplied joint-space density matrix
    Explicit(Array2<Complex<f64>>),
}

impl InitialDensity {
    /// The density matrix for a joint space with local dimensions `dims`.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameter` if an explicit matrix has the wrong shape
    /// or is not Hermitian with unit trace.
    #[allow(clippy::cast_precision_loss)]
    pub fn matrix(&self, dims: &[usize]) -> Result<Array2<Complex<f64>>> {
        let dimension = dims.iter().product::<usize>();
        match self {
            InitialDensity::PolarizedProbe => {
                let bath = dimension / dims[0];
                let mut rho = Array2::zeros((dimension, dimension));
                for i in 0..bath {
                    rho[[i, i]] = Complex::from(1.0 / bath as f64);
                }
                Ok(rho)
            }
            InitialDensity::Explicit(rho) => {
                if rho.shape() != [dimension, dimension] {
                    return Err(SolverError::invalid_parameter(
                        "initial_density",
                        format!("shape {:?} does not match dimension {dimension}", rho.shape()),
                    ));
                }
                let trace = rho.diag().sum();
                let hermitian = rho
                    .indexed_iter()
                    .all(|((i, j), x)| (x - rho[[j, i]].conj()).norm() < 1e-10);
                if !hermitian || (trace - 1.0).norm() > 1e-8 {
                    return Err(SolverError::invalid_parameter(
                        "initial_density",
                        "must be Hermitian with unit trace",
                    ));
                }
                Ok(rho.clone())
            }
        }
    }
}

/// `S_z / I` of the probe as a diagonal of the joint space.
#[allow(clippy::cast_precision_loss)]
fn polarization_diagonal(dims: &[usize]) -> Array1<f64> {
    let dimension = dims.iter().product::<usize>();
    let bath = dimension / dims[0];
    let spin = (dims[0] - 1) as f64 / 2.0;
    Array1::from_iter((0..dimension).map(|i| (spin - (i / bath) as f64) / spin))
}

/// A Hamiltonian diagonalised together with one initial state and observable.
pub struct Diagonalized {
    energies: Array1<f64>,
    /// `rho~_{ab} O~_{ba}`
    weights: Array2<Complex<f64>>,
}

impl Diagonalized {
    /// # Errors
    ///
    /// Fails if the initial density is invalid or the diagonalisation fails.
    pub fn new(hamiltonian: &Hamiltonian, initial: &InitialDensity) -> Result<Self> {
        let dims = hamiltonian.dims();
        let rho = initial.matrix(dims)?;
        let (energies, vectors) = hamiltonian.dense().eigh(UPLO::Lower)?;
        let vectors_h = vectors.t().mapv(|x| x.conj());

        let rho_t = vectors_h.dot(&rho).dot(&vectors);
        // O is diagonal, so O~ = U^dagger diag(o) U
        let observable = polarization_diagonal(dims).mapv(Complex::from);
        let scaled = &vectors * &observable.insert_axis(ndarray::Axis(1));
        let observable_t = vectors_h.dot(&scaled);

        let weights = &rho_t * &observable_t.t();
        debug!(dimension = energies.len(), "Diagonalised Hamiltonian");
        Ok(Self { energies, weights })
    }

    #[must_use]
    pub fn energies(&self) -> &Array1<f64> {
        &self.energies
    }

    fn polarization_at(&self, t: f64) -> f64 {
        let phases = self.energies.mapv(|e| Complex::new(0.0, e * t).exp());
        let weighted = self.weights.dot(&phases);
        phases
            .iter()
            .zip(weighted.iter())
            .map(|(p, w)| p.conj() * w)
            .sum::<Complex<f64>>()
            .re
    }

    /// The polarization at every entry of `times`, evaluated in parallel if requested.
    #[must_use]
    pub fn polarization(&self, times: &[f64], parallel: bool) -> Vec<f64> {
        if parallel {
            times.par_iter().map(|t| self.polarization_at(*t)).collect()
        } else {
            times.iter().map(|t| self.polarization_at(*t)).collect()
        }
    }
}

/// Exact probe polarization over `times`.
///
/// # Errors
///
/// Fails with `ResourceExhaustion` if the joint dimension exceeds
/// `config.max_exact_dimension`, with `InvalidParameter` for an invalid grid
/// or initial density, and with `LinearAlgebra` if diagonalisation fails.
pub fn solve_exact(
    hamiltonian: &Hamiltonian,
    initial: &InitialDensity,
    times: &[f64],
    config: &SimulationConfig,
) -> Result<Trajectory> {
    validate_times(times)?;
    let dimension = hamiltonian.dimension();
    if dimension > config.max_exact_dimension {
        return Err(SolverError::ResourceExhaustion {
            dimension,
            limit: config.max_exact_dimension,
        });
    }
    let diagonalized = Diagonalized::new(hamiltonian, initial)?;
    Trajectory::new(times.to_vec(), diagonalized.polarization(times, config.parallel))
}
