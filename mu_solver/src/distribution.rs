use ndarray::Array1;
use num_complex::Complex;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The Standard Normal distribution for a complex number
/// ``<z_i z_j*> = delta_ij``
pub struct StandardComplexNormal;

impl Distribution<Complex<f64>> for StandardComplexNormal {
    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Complex<f64> {
        let re = rng.sample::<f64, _>(StandardNormal) / std::f64::consts::SQRT_2;
        let im = rng.sample::<f64, _>(StandardNormal) / std::f64::consts::SQRT_2;
        Complex { re, im }
    }
}

/// How the local state of each bath spin is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BathSampling {
    /// Uniform on the unit sphere of the local Hilbert space
    #[default]
    Haar,
    /// A uniformly chosen `|m>` basis state
    BasisState,
}

/// A product state with the probe in `|m = +I>` and random bath factors.
///
/// For either choice of [`BathSampling`] the mean of `|psi><psi|` is
/// `|+I><+I| (x) 1 / D_bath`, so averaging `<psi| A |psi>` gives the
/// expectation in the polarized-probe, mixed-bath state. Haar factors have
/// the smaller variance.
#[derive(Clone, Debug)]
pub struct RandomProductState {
    dims: Vec<usize>,
    sampling: BathSampling,
}

impl RandomProductState {
    /// # Panics
    ///
    /// Will panic if `dims` is empty or contains a zero dimension
    #[must_use]
    pub fn new(dims: &[usize], sampling: BathSampling) -> Self {
        assert!(!dims.is_empty());
        assert!(dims.iter().all(|d| *d > 0));
        Self {
            dims: dims.to_vec(),
            sampling,
        }
    }

    fn sample_local<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Array1<Complex<f64>> {
        match self.sampling {
            BathSampling::Haar => loop {
                let v = Array1::from_iter((0..n).map(|_| StandardComplexNormal.sample(rng)));
                let norm = v.iter().map(Complex::norm_sqr).sum::<f64>().sqrt();
                if norm > 0.0 {
                    break v.mapv(|x| x / norm);
                }
            },
            BathSampling::BasisState => {
                let mut v = Array1::zeros(n);
                v[rng.gen_range(0..n)] = Complex::from(1.0);
                v
            }
        }
    }
}

impl Distribution<Array1<Complex<f64>>> for RandomProductState {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<Complex<f64>> {
        let mut probe = Array1::zeros(self.dims[0]);
        probe[0] = Complex::from(1.0);

        self.dims[1..].iter().fold(probe, |state, d| {
            let local = self.sample_local(rng, *d);
            // Later factors vary fastest, matching the Kronecker ordering
            Array1::from_iter(
                state
                    .iter()
                    .flat_map(|s| local.iter().map(move |l| s * l)),
            )
        })
    }
}
