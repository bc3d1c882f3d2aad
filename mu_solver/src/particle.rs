use crate::{
    error::{Result, SolverError},
    geometry::{self, Rotation, Tensor3, Vector3},
    isotope,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A spin quantum number, stored as an integer number of halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spin {
    halves: u32,
}

impl Spin {
    pub const HALF: Spin = Spin { halves: 1 };

    /// # Errors
    ///
    /// Fails with `InvalidSpin` unless `value` is a non-negative multiple of 1/2
    /// with `2 * value` no larger than `u32::MAX`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(value: f64) -> Result<Self> {
        let twice = 2.0 * value;
        if !twice.is_finite()
            || twice < 0.0
            || twice > f64::from(u32::MAX)
            || (twice - twice.round()).abs() > 1e-9
        {
            return Err(SolverError::InvalidSpin { value });
        }
        Ok(Self {
            halves: twice.round() as u32,
        })
    }

    #[must_use]
    pub fn from_halves(halves: u32) -> Self {
        Self { halves }
    }

    #[must_use]
    pub fn halves(&self) -> u32 {
        self.halves
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        f64::from(self.halves) / 2.0
    }

    /// Number of Zeeman levels, `2I + 1`.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.halves as usize + 1
    }
}

/// Static quadrupolar coupling of a single nucleus.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Quadrupole {
    /// Electric field gradient at the nucleus, in V m^-2.
    /// Combined with the nuclear quadrupole moment of the particle.
    Efg(Tensor3),
    /// Coupling induced by the muon charge, in s^-1.
    /// The principal axis is the muon to nucleus direction, and
    /// `H_Q = (omega_q / 3) (3 (S . n)^2 - S^2)`.
    MuonInduced { omega_q: f64 },
}

/// A muon or nucleus at a fixed position.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Particle {
    label: String,
    position: Vector3,
    spin: Spin,
    gamma: f64,
    quadrupole_moment: f64,
    quadrupole: Option<Quadrupole>,
}

impl Particle {
    /// A particle with spin `spin` and gyromagnetic ratio `gamma` (rad s^-1 T^-1).
    #[must_use]
    pub fn new(label: impl Into<String>, position: Vector3, spin: Spin, gamma: f64) -> Self {
        Self {
            label: label.into(),
            position,
            spin,
            gamma,
            quadrupole_moment: 0.0,
            quadrupole: None,
        }
    }

    #[must_use]
    pub fn muon(position: Vector3) -> Self {
        let mu = isotope::ISOTOPES[0];
        Self::new(mu.label, position, Spin::HALF, mu.gamma)
    }

    /// # Errors
    ///
    /// Fails with `UnknownIsotope` if `label` is not a known species.
    pub fn from_isotope(label: &str, position: Vector3) -> Result<Self> {
        let isotope = isotope::lookup(label)?;
        Ok(Self {
            quadrupole_moment: isotope.quadrupole_moment,
            ..Self::new(
                isotope.label,
                position,
                Spin::from_halves(isotope.spin_halves),
                isotope.gamma,
            )
        })
    }

    /// Electric quadrupole moment, in m^2.
    #[must_use]
    pub fn with_quadrupole_moment(self, quadrupole_moment: f64) -> Self {
        Self {
            quadrupole_moment,
            ..self
        }
    }

    #[must_use]
    pub fn with_efg(self, efg: Tensor3) -> Self {
        Self {
            quadrupole: Some(Quadrupole::Efg(efg)),
            ..self
        }
    }

    /// Attach the field gradient of a point charge at `charge`, with principal
    /// component `vzz` (see [`geometry::point_charge_efg`]).
    ///
    /// # Errors
    ///
    /// Fails with `InvalidGeometry` if the charge sits on the nucleus.
    pub fn with_point_charge_efg(self, charge: Vector3, vzz: f64) -> Result<Self> {
        let efg = geometry::point_charge_efg(charge, self.position, vzz)?;
        Ok(self.with_efg(efg))
    }

    #[must_use]
    pub fn with_muon_induced_quadrupole(self, omega_q: f64) -> Self {
        Self {
            quadrupole: Some(Quadrupole::MuonInduced { omega_q }),
            ..self
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn position(&self) -> Vector3 {
        self.position
    }

    #[must_use]
    pub fn spin(&self) -> Spin {
        self.spin
    }

    #[must_use]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    #[must_use]
    pub fn quadrupole_moment(&self) -> f64 {
        self.quadrupole_moment
    }

    #[must_use]
    pub fn quadrupole(&self) -> Option<&Quadrupole> {
        self.quadrupole.as_ref()
    }

    /// Check that the particle describes something physical.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameter` for non-finite values, an asymmetric or
    /// traced EFG, or a quadrupole on a spin below 1.
    pub fn validate(&self) -> Result<()> {
        if !self.position.iter().all(|x| x.is_finite()) {
            return Err(SolverError::invalid_parameter(
                "position",
                format!("{} has non-finite position {:?}", self.label, self.position),
            ));
        }
        if !self.gamma.is_finite() {
            return Err(SolverError::invalid_parameter(
                "gamma",
                format!("{} has non-finite gyromagnetic ratio", self.label),
            ));
        }
        let Some(quadrupole) = &self.quadrupole else {
            return Ok(());
        };
        if self.spin.halves() < 2 {
            return Err(SolverError::invalid_parameter(
                "quadrupole",
                format!(
                    "{} has spin {} and cannot carry a quadrupole coupling",
                    self.label,
                    self.spin.value()
                ),
            ));
        }
        match quadrupole {
            Quadrupole::Efg(efg) => {
                let scale = efg.iter().flatten().fold(0f64, |acc, x| acc.max(x.abs()));
                if !scale.is_finite() || !self.quadrupole_moment.is_finite() {
                    return Err(SolverError::invalid_parameter(
                        "efg",
                        format!("{} has a non-finite field gradient", self.label),
                    ));
                }
                let tolerance = 1e-9 * scale;
                let asymmetric = (0..3)
                    .any(|i| (0..i).any(|j| (efg[i][j] - efg[j][i]).abs() > tolerance));
                if asymmetric || geometry::trace(efg).abs() > tolerance {
                    return Err(SolverError::invalid_parameter(
                        "efg",
                        format!("{} field gradient must be symmetric and traceless", self.label),
                    ));
                }
            }
            Quadrupole::MuonInduced { omega_q } => {
                if !omega_q.is_finite() {
                    return Err(SolverError::invalid_parameter(
                        "omega_q",
                        format!("{} has a non-finite quadrupole coupling", self.label),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The same particle seen from a frame shifted by `-origin` then rotated.
    pub(crate) fn transformed(&self, origin: Vector3, rotation: &Rotation) -> Self {
        let quadrupole = self.quadrupole.map(|q| match q {
            Quadrupole::Efg(efg) => Quadrupole::Efg(rotation.apply_tensor(&efg)),
            induced @ Quadrupole::MuonInduced { .. } => induced,
        });
        Self {
            position: rotation.apply(geometry::sub(self.position, origin)),
            quadrupole,
            ..self.clone()
        }
    }
}
