use crate::{
    embedding::joint_dimension,
    error::{Result, SolverError},
    geometry::{self, Rotation, Vector3},
    particle::{Particle, Quadrupole, Spin},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered list of particles in an external field.
///
/// Particle 0 is the probe whose polarization is measured, and particle `k`
/// is factor `k` of the joint Hilbert space.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpinSystem {
    particles: Vec<Particle>,
    /// External field, in T
    field: Vector3,
}

fn validate_field(field: Vector3) -> Result<()> {
    if field.iter().all(|b| b.is_finite()) {
        Ok(())
    } else {
        Err(SolverError::invalid_parameter(
            "external_field",
            format!("field {field:?} is not finite"),
        ))
    }
}

impl SpinSystem {
    /// # Errors
    ///
    /// Fails if the list is empty, if any particle is invalid, if the probe has
    /// spin zero, or if two particles coincide.
    pub fn new(particles: Vec<Particle>, field: Vector3) -> Result<Self> {
        let Some(probe) = particles.first() else {
            return Err(SolverError::invalid_parameter(
                "particles",
                "at least the probe particle is required",
            ));
        };
        if probe.spin().halves() == 0 {
            return Err(SolverError::invalid_parameter(
                "particles",
                format!("probe {} has spin zero", probe.label()),
            ));
        }
        if let Some(Quadrupole::MuonInduced { .. }) = probe.quadrupole() {
            return Err(SolverError::invalid_parameter(
                "quadrupole",
                "the probe cannot carry a coupling induced by itself",
            ));
        }
        for particle in &particles {
            particle.validate()?;
        }
        for (i, a) in particles.iter().enumerate() {
            for b in &particles[..i] {
                geometry::separation(a.position(), b.position())?;
            }
        }
        validate_field(field)?;

        Ok(Self { particles, field })
    }

    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[must_use]
    pub fn probe(&self) -> &Particle {
        &self.particles[0]
    }

    #[must_use]
    pub fn field(&self) -> Vector3 {
        self.field
    }

    /// # Errors
    ///
    /// Fails with `InvalidParameter` if `field` is not finite.
    pub fn set_field(&mut self, field: Vector3) -> Result<()> {
        validate_field(field)?;
        self.field = field;
        Ok(())
    }

    #[must_use]
    pub fn spins(&self) -> Vec<Spin> {
        self.particles.iter().map(Particle::spin).collect()
    }

    #[must_use]
    pub fn dims(&self) -> Vec<usize> {
        self.particles.iter().map(|p| p.spin().dimension()).collect()
    }

    /// Joint Hilbert-space dimension, saturating at `usize::MAX`.
    #[must_use]
    pub fn dimension(&self) -> usize {
        joint_dimension(&self.dims()).unwrap_or(usize::MAX)
    }

    /// The system seen from a frame whose origin is `origin`.
    #[must_use]
    pub fn translated(&self, origin: Vector3) -> Self {
        self.transformed(origin, &Rotation::identity())
    }

    /// Rotate every position and field gradient of the sample.
    /// The external field is fixed in the laboratory frame.
    #[must_use]
    pub fn rotated(&self, rotation: &Rotation) -> Self {
        self.transformed([0.0; 3], rotation)
    }

    /// Move the probe to the origin and rotate so that `axis` becomes z.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidGeometry` if `axis` is degenerate.
    pub fn aligned_to(&self, axis: Vector3) -> Result<Self> {
        let rotation = Rotation::to_z(axis)?;
        Ok(self.transformed(self.probe().position(), &rotation))
    }

    /// Keep the probe and only the particles within `radius` of it.
    #[must_use]
    pub fn truncated(&self, radius: f64) -> Self {
        let origin = self.probe().position();
        let particles = self
            .particles
            .iter()
            .enumerate()
            .filter(|(i, p)| {
                *i == 0 || geometry::norm(geometry::sub(p.position(), origin)) <= radius
            })
            .map(|(_, p)| p.clone())
            .collect();
        Self {
            particles,
            field: self.field,
        }
    }

    fn transformed(&self, origin: Vector3, rotation: &Rotation) -> Self {
        Self {
            particles: self
                .particles
                .iter()
                .map(|p| p.transformed(origin, rotation))
                .collect(),
            field: self.field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn muon_fluorine() -> SpinSystem {
        SpinSystem::new(
            vec![
                Particle::muon([1e-10, 0.0, 0.0]),
                Particle::from_isotope("19F", [1e-10, 1.2e-10, 0.0]).unwrap(),
                Particle::from_isotope("63Cu", [1e-10, 0.0, 3e-10]).unwrap(),
            ],
            [0.0, 0.0, 0.01],
        )
        .unwrap()
    }

    #[test]
    fn test_dimension() {
        let system = muon_fluorine();
        assert_eq!(system.dims(), vec![2, 2, 4]);
        assert_eq!(system.dimension(), 16);
    }

    #[test]
    fn test_coincident_particles_fail() {
        let result = SpinSystem::new(
            vec![
                Particle::muon([0.0; 3]),
                Particle::from_isotope("19F", [0.0; 3]).unwrap(),
            ],
            [0.0; 3],
        );
        assert!(matches!(result, Err(SolverError::InvalidGeometry(_))));
    }

    #[test]
    fn test_empty_system_fails() {
        assert!(matches!(
            SpinSystem::new(vec![], [0.0; 3]),
            Err(SolverError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_aligned_to_moves_probe_to_origin() {
        let aligned = muon_fluorine().aligned_to([0.0, 1.0, 0.0]).unwrap();
        assert!(geometry::norm(aligned.probe().position()) < 1e-25);
        let f = aligned.particles()[1].position();
        assert!(f[0].abs() < 1e-22 && f[1].abs() < 1e-22);
        assert!((f[2] - 1.2e-10).abs() < 1e-22);
        assert_eq!(aligned.field(), [0.0, 0.0, 0.01]);
    }

    #[test]
    fn test_truncated_keeps_near_neighbours() {
        let truncated = muon_fluorine().truncated(2e-10);
        assert_eq!(truncated.particles().len(), 2);
        assert_eq!(truncated.particles()[1].label(), "19F");
    }

    #[test]
    fn test_set_field_rejects_nan() {
        let mut system = muon_fluorine();
        assert!(system.set_field([f64::NAN, 0.0, 0.0]).is_err());
        assert_eq!(system.field(), [0.0, 0.0, 0.01]);
    }
}
