//! Error types for sampler construction and sampling.

use thiserror::Error;

use crate::aliases::Backend;

/// Errors that can occur while building or drawing from a sampler.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// The name (or alias) has no implementation in the requested backend.
    #[error("Distribution {name} has no implementation in backend {backend}")]
    UnsupportedDistribution { name: String, backend: Backend },

    /// A required parameter was not supplied.
    #[error("Distribution {distribution} requires parameter `{param}`")]
    MissingParameter {
        distribution: &'static str,
        param: &'static str,
    },

    /// A parameter was supplied but its value is unusable.
    #[error("Invalid parameter `{param}` for {distribution}: {reason}")]
    InvalidParameter {
        distribution: String,
        param: String,
        reason: String,
    },

    /// Arrays could not be combined (concatenation or broadcasting).
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(#[from] ndarray::ShapeError),

    /// The acceptance region of a truncated sampler is too unlikely.
    #[error("Truncation region has empirical probability {share}, below threshold {threshold}")]
    Truncation { share: f64, threshold: f64 },

    /// Truncated sampling could not fill the request within the iteration limit.
    #[error("Drew only {drawn} of {size} rows after {iters} truncation rounds")]
    MaxItersExceeded {
        iters: usize,
        drawn: usize,
        size: usize,
    },
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, SamplerError>;
