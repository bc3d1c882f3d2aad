use thiserror::Error;

/// Result type alias for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;

/// Errors raised while assembling or solving a muon/nuclear spin system.
///
/// All of these are detected before any joint-space matrix is built,
/// except `Numerical` and `LinearAlgebra`.
#[derive(Error, Debug)]
pub enum SolverError {
    /// Coincident particles, zero-length axes and similar degenerate geometry.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Spin quantum number that is negative or not a multiple of 1/2.
    #[error("Invalid spin quantum number {value}: must be a non-negative multiple of 1/2")]
    InvalidSpin { value: f64 },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The joint Hilbert space is too large for the requested method.
    #[error("Hilbert space dimension {dimension} exceeds the limit of {limit}")]
    ResourceExhaustion { dimension: usize, limit: usize },

    #[error("Unknown isotope '{0}'")]
    UnknownIsotope(String),

    /// NaN or infinite values produced during propagation.
    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Linear algebra error: {0}")]
    LinearAlgebra(#[from] ndarray_linalg::error::LinalgError),
}

impl SolverError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry(reason.into())
    }

    pub fn numerical(reason: impl Into<String>) -> Self {
        Self::Numerical(reason.into())
    }
}
