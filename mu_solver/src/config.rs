use crate::{
    distribution::BathSampling,
    error::{Result, SolverError},
    solvers::Splitting,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Knobs shared by the exact and stochastic solves.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// Largest joint dimension the exact solver will diagonalise
    pub max_exact_dimension: usize,
    /// Independent random states averaged by a stochastic solve
    pub n_realizations: usize,
    /// Base seed of the realizations, drawn from entropy if `None`
    pub seed: Option<u64>,
    pub bath_sampling: BathSampling,
    pub splitting: Splitting,
    /// Polarization magnitudes above `1 + polarization_tolerance` are reported
    pub polarization_tolerance: f64,
    /// Run realizations, field values and exact time points on the rayon pool
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_exact_dimension: 8192,
            n_realizations: 1,
            seed: None,
            bath_sampling: BathSampling::default(),
            splitting: Splitting::default(),
            polarization_tolerance: 1e-6,
            parallel: true,
        }
    }
}

impl SimulationConfig {
    /// # Errors
    ///
    /// Fails with `InvalidParameter` for zero counts or a negative tolerance.
    pub fn validate(&self) -> Result<()> {
        if self.max_exact_dimension == 0 {
            return Err(SolverError::invalid_parameter(
                "max_exact_dimension",
                "must be at least 1",
            ));
        }
        if self.n_realizations == 0 {
            return Err(SolverError::invalid_parameter(
                "n_realizations",
                "must be at least 1",
            ));
        }
        if !self.polarization_tolerance.is_finite() || self.polarization_tolerance < 0.0 {
            return Err(SolverError::invalid_parameter(
                "polarization_tolerance",
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_realizations_rejected() {
        let config = SimulationConfig {
            n_realizations: 0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SolverError::InvalidParameter { .. })
        ));
    }
}
