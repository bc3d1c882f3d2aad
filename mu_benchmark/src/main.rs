use std::{hint::black_box, time::Instant};

use mu_solver::{
    geometry::CELIO_PRL_VZZ, MuonNuclearInteraction, Particle, SimulationConfig,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{level_filters::LevelFilter, Level};

/// Lattice constant of fcc copper, in m
const COPPER_LATTICE: f64 = 3.621_262_550_4e-10;

/// A muon in the octahedral interstitial of copper, with its six nearest neighbours.
fn copper_octahedral() -> Vec<Particle> {
    let d = COPPER_LATTICE / 2.0;
    let mut particles = vec![Particle::muon([0.0; 3])];
    for axis in 0..3 {
        for sign in [1.0, -1.0] {
            let mut position = [0.0; 3];
            position[axis] = sign * d;
            let copper = Particle::from_isotope("63Cu", position)
                .and_then(|p| p.with_point_charge_efg([0.0; 3], CELIO_PRL_VZZ))
                .unwrap();
            particles.push(copper);
        }
    }
    particles
}

fn times() -> Vec<f64> {
    (0..200).map(|i| f64::from(i) * 16e-6 / 199.0).collect()
}

#[allow(dead_code)]
fn celio_field_scan_benchmark() {
    let config = SimulationConfig {
        n_realizations: 4,
        seed: Some(0),
        ..SimulationConfig::default()
    };
    let mut interaction = MuonNuclearInteraction::new(copper_octahedral(), [0.0; 3])
        .and_then(|i| i.with_config(config))
        .unwrap()
        .with_log_level(LevelFilter::INFO);
    interaction.apply_rotation([1.0, 1.0, 1.0]).unwrap();

    let fields = [0.0, 1e-3, 3e-3, 7e-3, 8e-3, 10e-3].map(|b| [0.0, 0.0, b]);
    let start = Instant::now();
    let scan = interaction.field_scan_stochastic(&fields, &times(), 2).unwrap();
    println!("field scan: {:?}", start.elapsed());
    for (field, trajectory) in fields.iter().zip(&scan) {
        let last = trajectory.polarization().last().copied().unwrap_or(f64::NAN);
        println!("B = {:.0e} T, P(t_max) = {last:.4}", field[2]);
    }
}

#[allow(dead_code)]
fn celio_single_realization_benchmark() {
    let interaction = MuonNuclearInteraction::new(copper_octahedral(), [0.0, 0.0, 1e-3])
        .unwrap()
        .with_log_level(LevelFilter::OFF);
    let mut rng = StdRng::seed_from_u64(0);
    let times = times();
    let start = Instant::now();
    for _ in 0..10 {
        black_box(
            interaction
                .solve_stochastic_with_rng(&times, 2, &mut rng)
                .unwrap(),
        );
    }
    println!("10 realizations: {:?}", start.elapsed());
}

#[allow(dead_code)]
fn exact_two_copper_benchmark() {
    let particles = copper_octahedral().into_iter().take(3).collect();
    let interaction = MuonNuclearInteraction::new(particles, [0.0; 3])
        .unwrap()
        .with_log_level(LevelFilter::OFF);
    let start = Instant::now();
    black_box(interaction.solve_exact(&times(), None).unwrap());
    println!("exact (mu + 2 Cu): {:?}", start.elapsed());
}

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
    celio_field_scan_benchmark();
}
