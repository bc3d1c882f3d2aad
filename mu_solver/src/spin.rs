use ndarray::{linalg::kron, Array2};
use num_complex::Complex;

use crate::particle::Spin;

/// Single-particle spin operators in the `|I, m>` basis.
///
/// Basis index 0 is `m = +I`, index `2I` is `m = -I`.
#[derive(Clone, Debug)]
pub struct SpinMatrices {
    pub spin: Spin,
    pub sx: Array2<Complex<f64>>,
    pub sy: Array2<Complex<f64>>,
    pub sz: Array2<Complex<f64>>,
    pub s_plus: Array2<Complex<f64>>,
    pub s_minus: Array2<Complex<f64>>,
}

impl SpinMatrices {
    /// Build the ladder operators and the Cartesian components from them.
    #[must_use]
    pub fn new(spin: Spin) -> Self {
        let n = spin.dimension();
        let s = spin.value();
        #[allow(clippy::cast_precision_loss)]
        let m = |i: usize| s - i as f64;

        let mut s_plus = Array2::<Complex<f64>>::zeros((n, n));
        for i in 1..n {
            // S+ |m_i> = sqrt(s(s+1) - m_i(m_i+1)) |m_i + 1>
            let mi = m(i);
            s_plus[[i - 1, i]] = Complex::from((s * (s + 1.0) - mi * (mi + 1.0)).sqrt());
        }
        let s_minus = s_plus.t().to_owned();

        let sx = (&s_plus + &s_minus).mapv(|x| x * 0.5);
        let sy = (&s_plus - &s_minus).mapv(|x| x * Complex::new(0.0, -0.5));
        let sz = Array2::from_diag(&ndarray::Array1::from_iter((0..n).map(|i| Complex::from(m(i)))));

        Self {
            spin,
            sx,
            sy,
            sz,
            s_plus,
            s_minus,
        }
    }

    /// The Cartesian components `[Sx, Sy, Sz]`.
    #[must_use]
    pub fn components(&self) -> [&Array2<Complex<f64>>; 3] {
        [&self.sx, &self.sy, &self.sz]
    }
}

/// The ordered tensor-product space of a list of spins.
///
/// Factor `k` of every Kronecker product is always particle `k`.
#[derive(Clone, Debug)]
pub struct JointSpace {
    locals: Vec<SpinMatrices>,
}

impl JointSpace {
    #[must_use]
    pub fn new(spins: &[Spin]) -> Self {
        Self {
            locals: spins.iter().map(|s| SpinMatrices::new(*s)).collect(),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.locals.iter().map(|l| l.spin.dimension()).product()
    }

    #[must_use]
    pub fn dims(&self) -> Vec<usize> {
        self.locals.iter().map(|l| l.spin.dimension()).collect()
    }

    #[must_use]
    pub fn n_sites(&self) -> usize {
        self.locals.len()
    }

    #[must_use]
    pub fn local(&self, site: usize) -> &SpinMatrices {
        &self.locals[site]
    }

    #[must_use]
    pub fn identity(&self) -> Array2<Complex<f64>> {
        Array2::eye(self.dimension())
    }

    /// `1 (x) ... (x) local (x) ... (x) 1`, with `local` acting on `site`.
    ///
    /// # Panics
    ///
    /// Will panic if `local` does not match the dimension of `site`
    #[must_use]
    pub fn embed(&self, site: usize, local: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
        let dims = self.dims();
        assert_eq!(local.shape(), [dims[site], dims[site]]);

        let before = dims[..site].iter().product::<usize>();
        let after = dims[site + 1..].iter().product::<usize>();
        kron(
            &kron(&Array2::<Complex<f64>>::eye(before), local),
            &Array2::<Complex<f64>>::eye(after),
        )
    }

    /// Component `axis` (0 = x, 1 = y, 2 = z) of the spin of `site` in the joint space.
    ///
    /// # Panics
    ///
    /// Will panic if `axis > 2`
    #[must_use]
    pub fn spin_operator(&self, site: usize, axis: usize) -> Array2<Complex<f64>> {
        self.embed(site, self.locals[site].components()[axis])
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;
    use num_complex::Complex;

    use super::*;

    fn assert_close(a: &Array2<Complex<f64>>, b: &Array2<Complex<f64>>) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).norm() < 1e-12, "{a} != {b}");
        }
    }

    #[test]
    fn test_sz_eigenvalues() {
        let matrices = SpinMatrices::new(Spin::from_halves(3));
        let diagonal = matrices.sz.diag().mapv(|x| x.re).to_vec();
        assert_eq!(diagonal, vec![1.5, 0.5, -0.5, -1.5]);
    }

    #[test]
    fn test_hermitian() {
        for halves in 1..6 {
            let matrices = SpinMatrices::new(Spin::from_halves(halves));
            for s in matrices.components() {
                assert_close(s, &s.t().mapv(|x| x.conj()));
            }
        }
    }

    #[test]
    fn test_commutator_and_casimir() {
        for halves in 1..6 {
            let spin = Spin::from_halves(halves);
            let m = SpinMatrices::new(spin);
            let commutator = m.sx.dot(&m.sy) - m.sy.dot(&m.sx);
            assert_close(&commutator, &m.sz.mapv(|x| x * Complex::i()));

            let s = spin.value();
            let casimir = m.sx.dot(&m.sx) + m.sy.dot(&m.sy) + m.sz.dot(&m.sz);
            assert_close(
                &casimir,
                &Array2::eye(spin.dimension()).mapv(|x: Complex<f64>| x * s * (s + 1.0)),
            );
        }
    }

    #[test]
    fn test_embedding_order() {
        let space = JointSpace::new(&[Spin::HALF, Spin::from_halves(2)]);
        assert_eq!(space.dimension(), 6);
        assert_eq!(space.dims(), vec![2, 3]);

        // Sz of the first particle is +1/2 on the first three joint states
        let sz0 = space.spin_operator(0, 2);
        let diagonal = sz0.diag().mapv(|x| x.re).to_vec();
        assert_eq!(diagonal, vec![0.5, 0.5, 0.5, -0.5, -0.5, -0.5]);

        let sz1 = space.spin_operator(1, 2);
        let diagonal = sz1.diag().mapv(|x| x.re).to_vec();
        assert_eq!(diagonal, vec![1.0, 0.0, -1.0, 1.0, 0.0, -1.0]);
    }

    #[test]
    fn test_operators_on_different_sites_commute() {
        let space = JointSpace::new(&[Spin::HALF, Spin::HALF, Spin::from_halves(3)]);
        let a = space.spin_operator(0, 0);
        let b = space.spin_operator(2, 1);
        assert_close(&a.dot(&b), &b.dot(&a));
    }
}
