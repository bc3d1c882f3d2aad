use ndarray::{Array1, Array2};
use ndarray_linalg::{Eigh, UPLO};
use num_complex::Complex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{embedding::EmbeddedOperator, error::Result, hamiltonian::Hamiltonian};

pub mod exact;
pub mod solver;
pub use solver::*;

/// `exp(-i h dt)` of a Hermitian matrix, through its eigendecomposition.
///
/// # Errors
///
/// Fails with `LinearAlgebra` if the diagonalisation fails.
pub fn unitary_propagator(h: &Array2<Complex<f64>>, dt: f64) -> Result<Array2<Complex<f64>>> {
    let (energies, vectors) = h.eigh(UPLO::Lower)?;
    let phases = energies.mapv(|e| Complex::new(0.0, -e * dt).exp());
    // U diag(phases) U^dagger
    let scaled = &vectors * &phases.insert_axis(ndarray::Axis(0));
    Ok(scaled.dot(&vectors.t().mapv(|x| x.conj())))
}

/// Ordering of the local exponentials in one Trotter step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Splitting {
    /// `e^{-i H_1 dt} ... e^{-i H_n dt}`, first order in `dt`
    LieTrotter,
    /// `e^{-i H_1 dt/2} ... e^{-i H_n dt} ... e^{-i H_1 dt/2}`, second order in `dt`
    #[default]
    Strang,
}

/// Propagates with a product of exponentials of the individual Hamiltonian
/// terms, never building a joint-space matrix.
#[derive(Default)]
pub struct TrotterSolver {
    pub splitting: Splitting,
}

pub struct TrotterPropagator {
    factors: Vec<EmbeddedOperator>,
}

impl Propagator for TrotterPropagator {
    fn step(&self, state: &mut Array1<Complex<f64>>) {
        for factor in &self.factors {
            factor.apply_in_place(state);
        }
    }
}

impl Solver for TrotterSolver {
    type Propagator = TrotterPropagator;

    fn propagator(&self, hamiltonian: &Hamiltonian, dt: f64) -> Result<Self::Propagator> {
        let exponential = |operator: &EmbeddedOperator, dt: f64| -> Result<EmbeddedOperator> {
            Ok(operator.with_local(unitary_propagator(operator.local(), dt)?))
        };

        let terms = hamiltonian.terms();
        let factors = match (self.splitting, terms.split_last()) {
            (_, None) => Vec::new(),
            (Splitting::LieTrotter, Some(_)) => terms
                .iter()
                .map(|t| exponential(&t.operator, dt))
                .collect::<Result<Vec<_>>>()?,
            (Splitting::Strang, Some((last, rest))) => {
                let halves = rest
                    .iter()
                    .map(|t| exponential(&t.operator, 0.5 * dt))
                    .collect::<Result<Vec<_>>>()?;
                let mut factors = halves.clone();
                factors.push(exponential(&last.operator, dt)?);
                factors.extend(halves.into_iter().rev());
                factors
            }
        };
        Ok(TrotterPropagator { factors })
    }
}

/// Propagates with the exact exponential of the full Hamiltonian.
///
/// Costs a full diagonalisation per distinct step size, and isolates the
/// statistical error of the stochastic average from the splitting error.
#[derive(Default)]
pub struct DenseSolver {}

pub struct DensePropagator {
    unitary: Array2<Complex<f64>>,
}

impl Propagator for DensePropagator {
    fn step(&self, state: &mut Array1<Complex<f64>>) {
        *state = self.unitary.dot(&*state);
    }
}

impl Solver for DenseSolver {
    type Propagator = DensePropagator;

    fn propagator(&self, hamiltonian: &Hamiltonian, dt: f64) -> Result<Self::Propagator> {
        Ok(DensePropagator {
            unitary: unitary_propagator(&hamiltonian.dense(), dt)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, Array2};
    use num_complex::Complex;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::Distribution;

    use super::*;
    use crate::{
        distribution::{BathSampling, RandomProductState},
        particle::Particle,
        system::SpinSystem,
    };

    fn fluorine_pair(field: [f64; 3]) -> Hamiltonian {
        let system = SpinSystem::new(
            vec![
                Particle::muon([0.0; 3]),
                Particle::from_isotope("19F", [0.0, 0.0, 1.17e-10]).unwrap(),
                Particle::from_isotope("19F", [0.0, 1.0e-10, -0.6e-10]).unwrap(),
            ],
            field,
        )
        .unwrap();
        Hamiltonian::build(&system, None).unwrap()
    }

    fn distance(a: &Array1<Complex<f64>>, b: &Array1<Complex<f64>>) -> f64 {
        (a - b).iter().map(Complex::norm_sqr).sum::<f64>().sqrt()
    }

    #[test]
    fn test_unitary_propagator_is_unitary() {
        let h = fluorine_pair([0.01, 0.0, 0.0]).dense();
        let u = unitary_propagator(&h, 1e-7).unwrap();
        let identity = u.dot(&u.t().mapv(|x| x.conj()));
        let expected = Array2::<Complex<f64>>::eye(8);
        assert!((&identity - &expected).iter().all(|x| x.norm() < 1e-12));
    }

    #[test]
    fn test_plan_shares_propagators() {
        let hamiltonian = fluorine_pair([0.0; 3]);
        let times = [0.0, 1e-7, 2e-7, 3e-7, 3e-7, 5e-7];
        let plan = DenseSolver::default().plan(&hamiltonian, &times, 2).unwrap();
        // Intervals of 1e-7 and 2e-7 only
        assert_eq!(plan.n_propagators(), 2);

        assert!(DenseSolver::default().plan(&hamiltonian, &times, 0).is_err());
        assert!(DenseSolver::default()
            .plan(&hamiltonian, &[2e-7, 1e-7], 1)
            .is_err());
    }

    #[test]
    fn test_trotter_error_decreases_with_steps() {
        let hamiltonian = fluorine_pair([0.01, 0.0, 0.0]);
        let distribution = RandomProductState::new(hamiltonian.dims(), BathSampling::Haar);
        let initial = distribution.sample(&mut StdRng::seed_from_u64(2));
        let times = [2e-8];

        let exact = DenseSolver::default()
            .solve(&initial, &hamiltonian, &StateMeasurement, &times, 1)
            .unwrap();
        let solver = TrotterSolver {
            splitting: Splitting::LieTrotter,
        };
        let coarse = solver
            .solve(&initial, &hamiltonian, &StateMeasurement, &times, 1)
            .unwrap();
        let fine = solver
            .solve(&initial, &hamiltonian, &StateMeasurement, &times, 8)
            .unwrap();

        let coarse_error = distance(&coarse[0], &exact[0]);
        let fine_error = distance(&fine[0], &exact[0]);
        assert!(coarse_error > 0.0);
        assert!(fine_error < coarse_error, "{fine_error} >= {coarse_error}");

        let strang = TrotterSolver::default()
            .solve(&initial, &hamiltonian, &StateMeasurement, &times, 1)
            .unwrap();
        assert!(distance(&strang[0], &exact[0]) < coarse_error);
    }

    #[test]
    fn test_strang_single_term_is_exact() {
        let system = SpinSystem::new(vec![Particle::muon([0.0; 3])], [0.01, 0.0, 0.0]).unwrap();
        let hamiltonian = Hamiltonian::build(&system, None).unwrap();
        let initial = Array1::from(vec![Complex::from(1.0), Complex::from(0.0)]);
        let times = [1e-8, 5e-8];

        let exact = DenseSolver::default()
            .solve(&initial, &hamiltonian, &StateMeasurement, &times, 1)
            .unwrap();
        let trotter = TrotterSolver::default()
            .solve(&initial, &hamiltonian, &StateMeasurement, &times, 3)
            .unwrap();
        for (a, b) in exact.iter().zip(&trotter) {
            assert!(distance(a, b) < 1e-10);
        }
    }

    #[test]
    fn test_precession_in_transverse_field() {
        let b = 0.01;
        let system = SpinSystem::new(vec![Particle::muon([0.0; 3])], [b, 0.0, 0.0]).unwrap();
        let gamma = system.probe().gamma();
        let hamiltonian = Hamiltonian::build(&system, None).unwrap();
        let initial = Array1::from(vec![Complex::from(1.0), Complex::from(0.0)]);
        let times = (0..20).map(|i| f64::from(i) * 5e-9).collect::<Vec<_>>();

        let polarization = TrotterSolver::default()
            .solve(
                &initial,
                &hamiltonian,
                &PolarizationMeasurement::new(hamiltonian.dims()),
                &times,
                1,
            )
            .unwrap();
        for (t, p) in times.iter().zip(polarization) {
            assert!((p - (gamma * b * t).cos()).abs() < 1e-9);
        }
    }

    struct StateMeasurement;

    impl Measurement for StateMeasurement {
        type Out = Array1<Complex<f64>>;
        fn measure(&self, state: &Array1<Complex<f64>>) -> Self::Out {
            state.clone()
        }
    }
}
