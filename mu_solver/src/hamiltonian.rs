//! Assembly of the Zeeman, dipolar and quadrupolar Hamiltonian.
//!
//! All terms are angular frequencies, i.e. the operator is `H / hbar`
//! in rad s^-1.

use ndarray::{linalg::kron, Array2};
use num_complex::Complex;
use tracing::debug;

use crate::{
    embedding::{joint_dimension, EmbeddedOperator},
    error::{Result, SolverError},
    geometry::{self, Tensor3, ELEMENTARY_CHARGE, HBAR},
    particle::{Particle, Quadrupole},
    spin::SpinMatrices,
    system::SpinSystem,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermKind {
    /// `-gamma_k B . S_k`
    Zeeman { site: usize },
    /// `-S_i . D_ij . S_j`
    Dipolar { first: usize, second: usize },
    /// `S_k . Q_k . S_k`
    Quadrupole { site: usize },
}

/// One contribution to the Hamiltonian, acting on one or two sites.
#[derive(Clone, Debug)]
pub struct LocalTerm {
    pub kind: TermKind,
    pub operator: EmbeddedOperator,
}

#[derive(Clone, Debug)]
pub struct Hamiltonian {
    dims: Vec<usize>,
    terms: Vec<LocalTerm>,
}

/// `sum_ab t_ab A_a B_b`, for a rank-2 tensor `t` and two sets of components.
fn contract(
    t: &Tensor3,
    a: [&Array2<Complex<f64>>; 3],
    b: [&Array2<Complex<f64>>; 3],
    dimension: usize,
    product: impl Fn(&Array2<Complex<f64>>, &Array2<Complex<f64>>) -> Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut out = Array2::zeros((dimension, dimension));
    for (ti, ai) in t.iter().zip(a) {
        for (tij, bj) in ti.iter().zip(b) {
            if *tij != 0.0 {
                out.scaled_add(Complex::from(*tij), &product(ai, bj));
            }
        }
    }
    out
}

/// The quadrupole coupling tensor of `particle`, in rad s^-1, such that
/// `H_Q = S . Q . S`.
fn quadrupole_tensor(particle: &Particle, probe: &Particle) -> Result<Option<Tensor3>> {
    let i = particle.spin().value();
    let tensor = match particle.quadrupole() {
        None => return Ok(None),
        Some(Quadrupole::Efg(efg)) => {
            // e Q / (2I (2I - 1) hbar) V
            let scale = ELEMENTARY_CHARGE * particle.quadrupole_moment()
                / (2.0 * i * (2.0 * i - 1.0) * HBAR);
            geometry::scale_tensor(efg, scale)
        }
        Some(Quadrupole::MuonInduced { omega_q }) => {
            let (n, _) = geometry::separation(probe.position(), particle.position())?;
            geometry::scale_tensor(&geometry::axial_tensor(n), omega_q / 3.0)
        }
    };
    Ok(tensor.iter().flatten().any(|x| *x != 0.0).then_some(tensor))
}

impl Hamiltonian {
    /// Assemble every term of the Hamiltonian of `system`.
    ///
    /// Dipolar pairs further apart than `cutoff` (in m) are left out.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameter` for a non-positive cutoff, with
    /// `InvalidGeometry` for coincident particles, and with
    /// `ResourceExhaustion` if the joint dimension does not fit in `usize`.
    pub fn build(system: &SpinSystem, cutoff: Option<f64>) -> Result<Self> {
        if let Some(cutoff) = cutoff {
            if cutoff.is_nan() || cutoff <= 0.0 {
                return Err(SolverError::invalid_parameter(
                    "cutoff",
                    format!("{cutoff} must be positive"),
                ));
            }
        }

        let particles = system.particles();
        let dims = system.dims();
        if joint_dimension(&dims).is_none() {
            return Err(SolverError::ResourceExhaustion {
                dimension: usize::MAX,
                limit: usize::MAX,
            });
        }
        let locals = particles
            .iter()
            .map(|p| SpinMatrices::new(p.spin()))
            .collect::<Vec<_>>();
        let field = system.field();
        let mut terms = Vec::new();

        if field.iter().any(|b| *b != 0.0) {
            for (site, (particle, local)) in particles.iter().zip(&locals).enumerate() {
                let mut zeeman = Array2::<Complex<f64>>::zeros((dims[site], dims[site]));
                for (b, s) in field.iter().zip(local.components()) {
                    zeeman = zeeman + s.mapv(|x| x * (-particle.gamma() * b));
                }
                terms.push(LocalTerm {
                    kind: TermKind::Zeeman { site },
                    operator: EmbeddedOperator::new(&dims, &[site], zeeman),
                });
            }
        }

        let mut skipped = 0usize;
        for second in 0..particles.len() {
            for first in 0..second {
                let (a, b) = (&particles[first], &particles[second]);
                let (_, r) = geometry::separation(a.position(), b.position())?;
                if cutoff.is_some_and(|c| r > c) {
                    skipped += 1;
                    continue;
                }
                let d = geometry::dipolar_tensor(a.position(), b.position(), a.gamma(), b.gamma())?;
                let d = geometry::scale_tensor(&d, -1.0);
                let local = contract(
                    &d,
                    locals[first].components(),
                    locals[second].components(),
                    dims[first] * dims[second],
                    |x, y| kron(x, y),
                );
                terms.push(LocalTerm {
                    kind: TermKind::Dipolar { first, second },
                    operator: EmbeddedOperator::new(&dims, &[first, second], local),
                });
            }
        }

        for (site, particle) in particles.iter().enumerate() {
            let Some(q) = quadrupole_tensor(particle, system.probe())? else {
                continue;
            };
            let s = locals[site].components();
            let local = contract(&q, s, s, dims[site], |x, y| x.dot(y));
            terms.push(LocalTerm {
                kind: TermKind::Quadrupole { site },
                operator: EmbeddedOperator::new(&dims, &[site], local),
            });
        }

        debug!(
            n_terms = terms.len(),
            skipped_pairs = skipped,
            dimension = system.dimension(),
            "Assembled Hamiltonian"
        );
        Ok(Self { dims, terms })
    }

    #[must_use]
    pub fn terms(&self) -> &[LocalTerm] {
        &self.terms
    }

    #[must_use]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Joint dimension, saturating at `usize::MAX`.
    #[must_use]
    pub fn dimension(&self) -> usize {
        joint_dimension(&self.dims).unwrap_or(usize::MAX)
    }

    /// The full Hamiltonian as a dense joint-space matrix.
    #[must_use]
    pub fn dense(&self) -> Array2<Complex<f64>> {
        let n = self.dimension();
        let mut out = Array2::zeros((n, n));
        for term in &self.terms {
            term.operator.add_to(&mut out, Complex::from(1.0));
        }
        out
    }
}
