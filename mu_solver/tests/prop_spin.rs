//! Property-based tests of the single-spin and embedded operator algebra.

use mu_solver::embedding::EmbeddedOperator;
use mu_solver::spin::{JointSpace, SpinMatrices};
use mu_solver::Spin;
use ndarray::Array2;
use num_complex::Complex;
use proptest::prelude::*;

fn max_abs(a: &Array2<Complex<f64>>) -> f64 {
    a.iter().fold(0f64, |acc, x| acc.max(x.norm()))
}

proptest! {
    /// [Sx, Sy] = i Sz and S^2 = I(I+1) for every spin up to 9/2.
    #[test]
    fn spin_algebra_holds(halves in 1u32..=9) {
        let s = SpinMatrices::new(Spin::from_halves(halves));
        let i = Complex::new(0.0, 1.0);

        let commutator = s.sx.dot(&s.sy) - s.sy.dot(&s.sx);
        prop_assert!(max_abs(&(commutator - s.sz.mapv(|x| x * i))) < 1e-12);

        let value = f64::from(halves) / 2.0;
        let casimir = s.sx.dot(&s.sx) + s.sy.dot(&s.sy) + s.sz.dot(&s.sz);
        for ((a, b), x) in casimir.indexed_iter() {
            let expected = if a == b { value * (value + 1.0) } else { 0.0 };
            prop_assert!((x - expected).norm() < 1e-10);
        }
    }

    /// Local embedding agrees with the dense Kronecker product.
    #[test]
    fn embedding_matches_joint_space(
        halves in prop::collection::vec(1u32..=3, 1..4),
        axis in 0usize..3,
        site in 0usize..3,
    ) {
        prop_assume!(site < halves.len());
        let spins = halves.iter().map(|h| Spin::from_halves(*h)).collect::<Vec<_>>();
        let space = JointSpace::new(&spins);
        let local = SpinMatrices::new(spins[site]).components()[axis].clone();

        let embedded = EmbeddedOperator::new(&space.dims(), &[site], local);
        let difference = embedded.to_dense() - space.spin_operator(site, axis);
        prop_assert!(max_abs(&difference) < 1e-12);
    }
}
