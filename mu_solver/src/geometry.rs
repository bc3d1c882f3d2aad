//! Cartesian geometry, coupling tensors and frame rotations.
//!
//! Positions are in meters, field gradients in V m^-2 and every coupling
//! tensor is expressed as an angular frequency (rad s^-1), so that the
//! Hamiltonian assembled from them is `H / hbar`.

use crate::error::{Result, SolverError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub type Vector3 = [f64; 3];
pub type Tensor3 = [[f64; 3]; 3];

/// mu_0 / 4 pi, in T m A^-1
pub const MU_0_OVER_4PI: f64 = 1e-7;
/// Reduced Planck constant, in J s
pub const HBAR: f64 = 1.054_571_817e-34;
/// Elementary charge, in C
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;
/// Vacuum permittivity, in F m^-1
pub const EPSILON_0: f64 = 8.854_187_812_8e-12;

/// Separations below this (in meters) are treated as coincident particles.
pub const MIN_SEPARATION: f64 = 1e-15;
/// Direction vectors shorter than this are treated as degenerate.
pub const AXIS_EPSILON: f64 = 1e-12;

/// Field gradient used by Celio (PRL 56, 2720) for the muon in Cu.
///
/// `(4 pi epsilon_0)^-1 0.27 A^-3 e = 3.8879043e20 V m^-2`, scaled by
/// 1.02702 so that the muon-induced coupling of 63Cu is 3.2e6 s^-1.
pub const CELIO_PRL_VZZ: f64 = 1.02702 * 3.887_904_3e20;

pub const IDENTITY: Tensor3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

#[inline]
#[must_use]
pub fn dot(a: Vector3, b: Vector3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
#[must_use]
pub fn cross(a: Vector3, b: Vector3) -> Vector3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
#[must_use]
pub fn norm(v: Vector3) -> f64 {
    dot(v, v).sqrt()
}

#[inline]
#[must_use]
pub fn sub(a: Vector3, b: Vector3) -> Vector3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
#[must_use]
pub fn add(a: Vector3, b: Vector3) -> Vector3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Normalise a direction vector.
///
/// # Errors
///
/// Fails with `InvalidGeometry` if the vector is shorter than [`AXIS_EPSILON`]
/// or not finite.
pub fn normalize(v: Vector3) -> Result<Vector3> {
    let n = norm(v);
    if !n.is_finite() || n < AXIS_EPSILON {
        return Err(SolverError::invalid_geometry(format!(
            "cannot normalise degenerate axis {v:?}"
        )));
    }
    Ok([v[0] / n, v[1] / n, v[2] / n])
}

#[must_use]
pub fn outer(a: Vector3, b: Vector3) -> Tensor3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, elem) in row.iter_mut().enumerate() {
            *elem = a[i] * b[j];
        }
    }
    out
}

#[must_use]
pub fn scale_tensor(t: &Tensor3, factor: f64) -> Tensor3 {
    t.map(|row| row.map(|x| x * factor))
}

#[must_use]
pub fn trace(t: &Tensor3) -> f64 {
    t[0][0] + t[1][1] + t[2][2]
}

/// The traceless axial tensor `3 n (x) n - 1` for a unit vector `n`.
#[must_use]
pub fn axial_tensor(n: Vector3) -> Tensor3 {
    let mut out = outer(n, n);
    for (i, row) in out.iter_mut().enumerate() {
        for (j, elem) in row.iter_mut().enumerate() {
            *elem = 3.0 * *elem - IDENTITY[i][j];
        }
    }
    out
}

/// Unit vector pointing from `from` to `to`, together with the distance.
///
/// # Errors
///
/// Fails with `InvalidGeometry` for separations below [`MIN_SEPARATION`].
pub fn separation(from: Vector3, to: Vector3) -> Result<(Vector3, f64)> {
    let d = sub(to, from);
    let r = norm(d);
    if !r.is_finite() || r < MIN_SEPARATION {
        return Err(SolverError::invalid_geometry(format!(
            "particles at {from:?} and {to:?} are coincident"
        )));
    }
    Ok(([d[0] / r, d[1] / r, d[2] / r], r))
}

/// Dipolar coupling tensor between two magnetic moments, in rad s^-1.
///
/// `D = (mu_0 / 4 pi) gamma_1 gamma_2 hbar (3 r (x) r - 1) / r^3`
///
/// The dipolar Hamiltonian built from it is `-S_1 . D . S_2`, which equals
/// `(mu_0 / 4 pi) gamma_1 gamma_2 hbar / r^3 [S_1 . S_2 - 3 (S_1 . r)(S_2 . r)]`.
///
/// # Errors
///
/// Fails with `InvalidGeometry` if the two positions coincide.
pub fn dipolar_tensor(
    position_1: Vector3,
    position_2: Vector3,
    gamma_1: f64,
    gamma_2: f64,
) -> Result<Tensor3> {
    let (n, r) = separation(position_1, position_2)?;
    let coupling = MU_0_OVER_4PI * gamma_1 * gamma_2 * HBAR / r.powi(3);
    Ok(scale_tensor(&axial_tensor(n), coupling))
}

/// Electric field gradient at a nucleus generated by a point charge.
///
/// `V = -Vzz (3 n (x) n - 1) / 2`, with `n` the unit vector from the charge to
/// the nucleus. The largest principal component has magnitude `vzz`.
/// This is a point-charge model, with no Sternheimer antishielding and no
/// lattice contribution.
///
/// # Errors
///
/// Fails with `InvalidGeometry` if the two positions coincide.
pub fn point_charge_efg(charge: Vector3, nucleus: Vector3, vzz: f64) -> Result<Tensor3> {
    let (n, _) = separation(charge, nucleus)?;
    Ok(scale_tensor(&axial_tensor(n), -0.5 * vzz))
}

/// Principal field gradient (V m^-2) of one elementary charge at distance `r` (m).
#[must_use]
pub fn vzz_unit_charge_at(r: f64) -> f64 {
    (2.0 / (4.0 * std::f64::consts::PI * EPSILON_0)) * (ELEMENTARY_CHARGE / r.powi(3))
}

/// A proper rotation of the sample frame.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rotation {
    matrix: Tensor3,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Rotation {
    #[must_use]
    pub fn identity() -> Self {
        Self { matrix: IDENTITY }
    }

    #[must_use]
    pub fn matrix(&self) -> &Tensor3 {
        &self.matrix
    }

    /// Rotation by `angle` radians about `axis` (Rodrigues' formula).
    ///
    /// # Errors
    ///
    /// Fails with `InvalidGeometry` if `axis` is degenerate.
    pub fn about_axis(axis: Vector3, angle: f64) -> Result<Self> {
        let k = normalize(axis)?;
        let (s, c) = angle.sin_cos();
        let kk = outer(k, k);
        let cross_k = [[0.0, -k[2], k[1]], [k[2], 0.0, -k[0]], [-k[1], k[0], 0.0]];

        let mut matrix = [[0.0; 3]; 3];
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, elem) in row.iter_mut().enumerate() {
                *elem = c * IDENTITY[i][j] + s * cross_k[i][j] + (1.0 - c) * kk[i][j];
            }
        }
        Ok(Self { matrix })
    }

    /// The rotation taking the direction `from` onto the direction `to`.
    ///
    /// Parallel and antiparallel directions are handled explicitly, so no
    /// near-zero norm is ever divided by.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidGeometry` if either direction is degenerate.
    pub fn aligning(from: Vector3, to: Vector3) -> Result<Self> {
        let a = normalize(from)?;
        let b = normalize(to)?;
        let axis = cross(a, b);
        let s = norm(axis);
        let c = dot(a, b);

        if s < AXIS_EPSILON {
            if c > 0.0 {
                return Ok(Self::identity());
            }
            // Half turn about any direction perpendicular to `a`
            let least_aligned = if a[0].abs() <= a[1].abs() && a[0].abs() <= a[2].abs() {
                [1.0, 0.0, 0.0]
            } else if a[1].abs() <= a[2].abs() {
                [0.0, 1.0, 0.0]
            } else {
                [0.0, 0.0, 1.0]
            };
            return Self::about_axis(cross(a, least_aligned), std::f64::consts::PI);
        }
        Self::about_axis(axis, s.atan2(c))
    }

    /// The rotation taking `axis` onto the quantization axis z.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidGeometry` if `axis` is degenerate.
    pub fn to_z(axis: Vector3) -> Result<Self> {
        Self::aligning(axis, [0.0, 0.0, 1.0])
    }

    #[must_use]
    pub fn apply(&self, v: Vector3) -> Vector3 {
        let m = &self.matrix;
        [dot(m[0], v), dot(m[1], v), dot(m[2], v)]
    }

    /// Rank-2 transformation `R T R^T`.
    #[must_use]
    pub fn apply_tensor(&self, t: &Tensor3) -> Tensor3 {
        let r = &self.matrix;
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, elem) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for k in 0..3 {
                    for l in 0..3 {
                        acc += r[i][k] * t[k][l] * r[j][l];
                    }
                }
                *elem = acc;
            }
        }
        out
    }

    #[must_use]
    pub fn inverse(&self) -> Self {
        let m = &self.matrix;
        Self {
            matrix: [
                [m[0][0], m[1][0], m[2][0]],
                [m[0][1], m[1][1], m[2][1]],
                [m[0][2], m[1][2], m[2][2]],
            ],
        }
    }

    /// The rotation applying `self` first, then `other`.
    #[must_use]
    pub fn then(&self, other: &Rotation) -> Self {
        let (a, b) = (&other.matrix, &self.matrix);
        let mut matrix = [[0.0; 3]; 3];
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, elem) in row.iter_mut().enumerate() {
                *elem = (0..3).map(|k| a[i][k] * b[k][j]).sum();
            }
        }
        Self { matrix }
    }
}
