//! Property-based tests of the frame rotations and coupling tensors.

use mu_solver::geometry::{dipolar_tensor, norm, point_charge_efg, trace, Rotation};
use mu_solver::hamiltonian::Hamiltonian;
use mu_solver::system::SpinSystem;
use mu_solver::Particle;
use proptest::prelude::*;

fn axis() -> impl Strategy<Value = [f64; 3]> {
    prop::array::uniform3(-1.0f64..1.0).prop_filter("degenerate axis", |a| norm(*a) > 1e-3)
}

fn position() -> impl Strategy<Value = [f64; 3]> {
    prop::array::uniform3(-5e-10f64..5e-10)
}

proptest! {
    /// A full turn about any axis is the identity on positions and tensors.
    #[test]
    fn full_turn_round_trip(axis in axis(), p in position(), charge in position()) {
        prop_assume!(norm([p[0] - charge[0], p[1] - charge[1], p[2] - charge[2]]) > 1e-11);
        let rotation = Rotation::about_axis(axis, 2.0 * std::f64::consts::PI).unwrap();

        let rotated = rotation.apply(p);
        for i in 0..3 {
            prop_assert!((rotated[i] - p[i]).abs() < 1e-24);
        }

        let efg = point_charge_efg(charge, p, 1e20).unwrap();
        let rotated = rotation.apply_tensor(&efg);
        for i in 0..3 {
            for j in 0..3 {
                prop_assert!((rotated[i][j] - efg[i][j]).abs() < 1e6);
            }
        }
    }

    /// The dipolar tensor is symmetric and traceless for any separation.
    #[test]
    fn dipolar_tensor_symmetric_traceless(a in position(), b in position()) {
        prop_assume!(norm([a[0] - b[0], a[1] - b[1], a[2] - b[2]]) > 1e-11);
        let d = dipolar_tensor(a, b, 8.5e8, 7.1e7).unwrap();
        let scale = d.iter().flatten().fold(0f64, |acc, x| acc.max(x.abs()));
        prop_assert!(trace(&d).abs() <= 1e-12 * scale);
        for i in 0..3 {
            for j in 0..3 {
                prop_assert!((d[i][j] - d[j][i]).abs() <= 1e-12 * scale);
            }
        }
    }

    /// The aligning rotation maps its axis onto z and is orthogonal.
    #[test]
    fn aligning_rotation_maps_axis_to_z(axis in axis()) {
        let rotation = Rotation::to_z(axis).unwrap();
        let n = norm(axis);
        let mapped = rotation.apply(axis);
        prop_assert!(mapped[0].abs() < 1e-12 && mapped[1].abs() < 1e-12);
        prop_assert!((mapped[2] - n).abs() < 1e-12);

        let product = rotation.then(&rotation.inverse());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                prop_assert!((product.matrix()[i][j] - expected).abs() < 1e-12);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// A full turn of the sample leaves its Hamiltonian unchanged.
    #[test]
    fn full_turn_preserves_hamiltonian(axis in axis(), f in position(), cu in position()) {
        prop_assume!(norm(f) > 5e-11 && norm(cu) > 5e-11);
        prop_assume!(norm([f[0] - cu[0], f[1] - cu[1], f[2] - cu[2]]) > 5e-11);

        let system = SpinSystem::new(
            vec![
                Particle::muon([0.0; 3]),
                Particle::from_isotope("19F", f).unwrap(),
                Particle::from_isotope("63Cu", cu)
                    .unwrap()
                    .with_point_charge_efg([0.0; 3], 3.9e20)
                    .unwrap(),
            ],
            [0.0, 0.0, 0.002],
        )
        .unwrap();
        let rotation = Rotation::about_axis(axis, 2.0 * std::f64::consts::PI).unwrap();

        let before = Hamiltonian::build(&system, None).unwrap().dense();
        let after = Hamiltonian::build(&system.rotated(&rotation), None).unwrap().dense();
        let scale = before.iter().fold(0f64, |acc, x| acc.max(x.norm()));
        for (a, b) in before.iter().zip(after.iter()) {
            prop_assert!((a - b).norm() <= 1e-9 * scale);
        }
    }
}
