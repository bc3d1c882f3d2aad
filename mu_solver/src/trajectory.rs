use crate::error::{Result, SolverError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Check that `times` is a finite, non-negative and non-decreasing grid.
///
/// # Errors
///
/// Fails with `InvalidParameter` naming the first offending entry.
pub fn validate_times(times: &[f64]) -> Result<()> {
    let mut previous = 0f64;
    for (i, t) in times.iter().enumerate() {
        if !t.is_finite() || *t < 0.0 {
            return Err(SolverError::invalid_parameter(
                "times",
                format!("entry {i} ({t}) must be finite and non-negative"),
            ));
        }
        if *t < previous {
            return Err(SolverError::invalid_parameter(
                "times",
                format!("entry {i} ({t}) is before entry {} ({previous})", i - 1),
            ));
        }
        previous = *t;
    }
    Ok(())
}

/// Probe polarization sampled on a caller supplied time grid.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trajectory {
    times: Vec<f64>,
    polarization: Vec<f64>,
}

impl Trajectory {
    /// # Errors
    ///
    /// Fails with `InvalidParameter` if the lengths differ.
    pub fn new(times: Vec<f64>, polarization: Vec<f64>) -> Result<Self> {
        if times.len() != polarization.len() {
            return Err(SolverError::invalid_parameter(
                "polarization",
                format!(
                    "{} values for a grid of {} times",
                    polarization.len(),
                    times.len()
                ),
            ));
        }
        Ok(Self {
            times,
            polarization,
        })
    }

    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    #[must_use]
    pub fn polarization(&self) -> &[f64] {
        &self.polarization
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// `(time, polarization)` pairs in time order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.polarization.iter().copied())
    }

    fn deviations<'a>(&'a self, other: &'a Trajectory) -> Result<impl Iterator<Item = f64> + 'a> {
        if self.times != other.times {
            return Err(SolverError::invalid_parameter(
                "other",
                "trajectories are sampled on different time grids",
            ));
        }
        Ok(self
            .polarization
            .iter()
            .zip(&other.polarization)
            .map(|(a, b)| a - b))
    }

    /// Mean of the squared difference to `other`, zero for an empty grid.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameter` if the time grids differ.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_squared_deviation(&self, other: &Trajectory) -> Result<f64> {
        let sum = self.deviations(other)?.map(|d| d * d).sum::<f64>();
        Ok(if self.is_empty() {
            0.0
        } else {
            sum / self.len() as f64
        })
    }

    /// # Errors
    ///
    /// Fails with `InvalidParameter` if the time grids differ.
    pub fn max_abs_deviation(&self, other: &Trajectory) -> Result<f64> {
        Ok(self.deviations(other)?.fold(0f64, |acc, d| acc.max(d.abs())))
    }

    /// Indices and values lying outside `[-1 - tolerance, 1 + tolerance]`.
    #[must_use]
    pub fn out_of_range(&self, tolerance: f64) -> Vec<(usize, f64)> {
        self.polarization
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_nan() || p.abs() > 1.0 + tolerance)
            .map(|(i, p)| (i, *p))
            .collect()
    }
}

/// Running sum of trajectories on a shared grid.
///
/// Accumulators over disjoint sets of realizations can be merged in any order.
#[derive(Clone, Debug)]
pub struct TrajectoryAccumulator {
    times: Vec<f64>,
    sum: Vec<f64>,
    count: usize,
}

impl TrajectoryAccumulator {
    #[must_use]
    pub fn new(times: &[f64]) -> Self {
        Self {
            times: times.to_vec(),
            sum: vec![0.0; times.len()],
            count: 0,
        }
    }

    /// # Panics
    ///
    /// Will panic if `polarization` does not match the grid length
    pub fn add(&mut self, polarization: &[f64]) {
        assert_eq!(polarization.len(), self.sum.len());
        for (s, p) in self.sum.iter_mut().zip(polarization) {
            *s += p;
        }
        self.count += 1;
    }

    /// # Panics
    ///
    /// Will panic if the two accumulators use different grids
    #[must_use]
    pub fn merge(mut self, other: TrajectoryAccumulator) -> Self {
        assert_eq!(self.times, other.times);
        for (s, o) in self.sum.iter_mut().zip(other.sum) {
            *s += o;
        }
        self.count += other.count;
        self
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// The sample mean, or `None` before anything was added.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<Trajectory> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(Trajectory {
            times: self.times.clone(),
            polarization: self.sum.iter().map(|s| s / n).collect(),
        })
    }
}
