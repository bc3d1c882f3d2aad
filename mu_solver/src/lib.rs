#![warn(clippy::pedantic)]

pub mod config;
pub mod distribution;
pub mod embedding;
pub mod error;
pub mod geometry;
pub mod hamiltonian;
pub mod interaction;
pub mod isotope;
pub mod logging;
pub mod particle;
pub mod solvers;
pub mod spin;
pub mod stochastic;
pub mod system;
pub mod trajectory;

pub use config::SimulationConfig;
pub use error::{Result, SolverError};
pub use interaction::MuonNuclearInteraction;
pub use particle::{Particle, Quadrupole, Spin};
pub use trajectory::Trajectory;

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use crate::{
        geometry::{vzz_unit_charge_at, CELIO_PRL_VZZ},
        MuonNuclearInteraction, Particle, SimulationConfig,
    };

    /// Two 63Cu at +-x around the muon, carrying opposite point-charge gradients.
    fn copper_pair() -> Vec<Particle> {
        let d = 3.621_262_550_4e-10 / 2.0;
        vec![
            Particle::muon([0.0; 3]),
            Particle::from_isotope("63Cu", [d, 0.0, 0.0])
                .unwrap()
                .with_point_charge_efg([0.0; 3], CELIO_PRL_VZZ)
                .unwrap(),
            Particle::from_isotope("63Cu", [-d, 0.0, 0.0])
                .unwrap()
                .with_point_charge_efg([0.0; 3], -CELIO_PRL_VZZ)
                .unwrap(),
        ]
    }

    #[test]
    fn test_copper_pair_initial_decay() {
        let interaction = MuonNuclearInteraction::new(copper_pair(), [0.0; 3])
            .unwrap()
            .with_log_level(LevelFilter::OFF);
        let times = (0..=10).map(|i| f64::from(i) * 2e-8).collect::<Vec<_>>();
        let trajectory = interaction.solve_exact(&times, None).unwrap();

        let p = trajectory.polarization();
        assert!((p[0] - 1.0).abs() < 1e-12);
        for window in p.windows(2) {
            assert!(window[1] < window[0], "{p:?} is not decreasing");
        }
    }

    #[test]
    fn test_copper_pair_celio_matches_exact() {
        let config = SimulationConfig {
            n_realizations: 300,
            seed: Some(2024),
            ..SimulationConfig::default()
        };
        let mut interaction = MuonNuclearInteraction::new(copper_pair(), [0.0, 0.0, 0.001])
            .unwrap()
            .with_config(config)
            .unwrap();
        interaction.apply_rotation([1.0, 0.0, 0.0]).unwrap();

        let times = (0..=10).map(|i| f64::from(i) * 2e-7).collect::<Vec<_>>();
        let exact = interaction.solve_exact(&times, None).unwrap();
        let celio = interaction.solve_stochastic(&times, 4).unwrap();
        assert!((celio.polarization()[0] - 1.0).abs() < 1e-12);
        assert!(celio.max_abs_deviation(&exact).unwrap() < 0.1);
    }

    #[test]
    fn test_cutoff_only_removes_distant_pairs() {
        let interaction = MuonNuclearInteraction::new(copper_pair(), [0.0; 3]).unwrap();
        let times = [0.0, 5e-7, 1e-6];
        // The Cu-Cu distance is twice the muon-Cu distance
        let near = interaction.solve_exact(&times, Some(2e-10)).unwrap();
        let far = interaction.solve_exact(&times, Some(20e-10)).unwrap();
        assert!(near.max_abs_deviation(&far).unwrap() < 1e-3);
        assert_eq!(interaction.hamiltonian(Some(2e-10)).unwrap().terms().len(), 4);
        assert_eq!(interaction.hamiltonian(Some(20e-10)).unwrap().terms().len(), 5);
    }

    #[test]
    fn test_unit_charge_gradient_is_close_to_celio() {
        // 0.27 e A^-3 is the gradient of a unit charge at about 1.95 A
        let r = (2.0f64 / 0.27).cbrt() * 1e-10;
        let ratio = vzz_unit_charge_at(r) / CELIO_PRL_VZZ;
        assert!((ratio - 1.0).abs() < 0.05, "{ratio}");
    }
}
