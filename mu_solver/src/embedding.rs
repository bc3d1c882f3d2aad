use std::sync::Arc;

use ndarray::{linalg::Dot, Array1, Array2};
use num_complex::Complex;

/// Any operator that can act on a joint-space state vector.
pub trait Tensor: Dot<Array1<Complex<f64>>, Output = Array1<Complex<f64>>> {}

impl<T: Dot<Array1<Complex<f64>>, Output = Array1<Complex<f64>>>> Tensor for T {}

/// Product of the local dimensions, `None` if it overflows `usize`.
#[must_use]
pub fn joint_dimension(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, d| acc.checked_mul(*d))
}

/// Index bookkeeping for an operator acting on a subset of sites.
#[derive(Debug)]
struct Layout {
    sites: Vec<usize>,
    dimension: usize,
    /// Joint-space offset of each local basis state
    offsets: Vec<usize>,
    /// Joint-space indices whose digits on `sites` are all zero
    bases: Vec<usize>,
}

impl Layout {
    fn new(dims: &[usize], sites: &[usize]) -> Self {
        assert!(
            sites.windows(2).all(|w| w[0] < w[1]),
            "sites must be strictly increasing"
        );
        assert!(sites.iter().all(|s| *s < dims.len()));

        let Some(dimension) = joint_dimension(dims) else {
            panic!("joint dimension overflows usize");
        };
        // stride_k = prod_{l > k} d_l, so the last site varies fastest
        let mut strides = vec![1; dims.len()];
        for k in (0..dims.len().saturating_sub(1)).rev() {
            strides[k] = strides[k + 1] * dims[k + 1];
        }

        let local_dimension = sites.iter().map(|s| dims[*s]).product::<usize>();
        let offsets = (0..local_dimension)
            .map(|mut l| {
                let mut offset = 0;
                for s in sites.iter().rev() {
                    offset += (l % dims[*s]) * strides[*s];
                    l /= dims[*s];
                }
                offset
            })
            .collect();

        let bases = (0..dimension)
            .filter(|i| sites.iter().all(|s| (i / strides[*s]) % dims[*s] == 0))
            .collect();

        Self {
            sites: sites.to_vec(),
            dimension,
            offsets,
            bases,
        }
    }
}

/// A dense operator on a few sites, acting as identity on all others.
///
/// Application costs `O(D d)` for a joint dimension `D` and local
/// dimension `d`, and no joint-space matrix is ever built.
#[derive(Clone, Debug)]
pub struct EmbeddedOperator {
    layout: Arc<Layout>,
    local: Array2<Complex<f64>>,
}

impl EmbeddedOperator {
    /// Embed `local`, whose factors are `sites` in increasing order,
    /// into the space with local dimensions `dims`.
    ///
    /// # Panics
    ///
    /// Will panic if `sites` is not strictly increasing, if the shape of
    /// `local` does not match the product of the site dimensions, or if the
    /// joint dimension overflows `usize`
    #[must_use]
    pub fn new(dims: &[usize], sites: &[usize], local: Array2<Complex<f64>>) -> Self {
        let layout = Layout::new(dims, sites);
        assert_eq!(local.shape(), [layout.offsets.len(), layout.offsets.len()]);
        Self {
            layout: Arc::new(layout),
            local,
        }
    }

    /// The operator on the same sites with a different local matrix.
    ///
    /// # Panics
    ///
    /// Will panic if the shape of `local` differs
    #[must_use]
    pub fn with_local(&self, local: Array2<Complex<f64>>) -> Self {
        assert_eq!(local.shape(), self.local.shape());
        Self {
            layout: Arc::clone(&self.layout),
            local,
        }
    }

    #[must_use]
    pub fn local(&self) -> &Array2<Complex<f64>> {
        &self.local
    }

    #[must_use]
    pub fn sites(&self) -> &[usize] {
        &self.layout.sites
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.layout.dimension
    }

    /// Add `scale * self` to a dense joint-space matrix.
    ///
    /// # Panics
    ///
    /// Will panic if `target` is not `dimension x dimension`
    pub fn add_to(&self, target: &mut Array2<Complex<f64>>, scale: Complex<f64>) {
        assert_eq!(target.shape(), [self.dimension(), self.dimension()]);
        let offsets = &self.layout.offsets;
        for base in &self.layout.bases {
            for (a, oa) in offsets.iter().enumerate() {
                for (b, ob) in offsets.iter().enumerate() {
                    target[[base + oa, base + ob]] += scale * self.local[[a, b]];
                }
            }
        }
    }

    #[must_use]
    pub fn to_dense(&self) -> Array2<Complex<f64>> {
        let mut out = Array2::zeros((self.dimension(), self.dimension()));
        self.add_to(&mut out, Complex::from(1.0));
        out
    }

    /// Replace `state` with `self . state` without allocating a new state.
    ///
    /// # Panics
    ///
    /// Will panic if `state` has the wrong length
    pub fn apply_in_place(&self, state: &mut Array1<Complex<f64>>) {
        assert_eq!(state.len(), self.dimension());
        let offsets = &self.layout.offsets;
        let mut gathered = Array1::<Complex<f64>>::zeros(offsets.len());
        for base in &self.layout.bases {
            for (g, o) in gathered.iter_mut().zip(offsets) {
                *g = state[base + o];
            }
            let updated = self.local.dot(&gathered);
            for (u, o) in updated.iter().zip(offsets) {
                state[base + o] = *u;
            }
        }
    }
}

impl Dot<Array1<Complex<f64>>> for EmbeddedOperator {
    type Output = Array1<Complex<f64>>;

    #[inline]
    fn dot(&self, rhs: &Array1<Complex<f64>>) -> Self::Output {
        let mut out = rhs.clone();
        self.apply_in_place(&mut out);
        out
    }
}
