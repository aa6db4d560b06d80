//! Error types for the neutralization engine.

use numerblox_data::ErrorKind;
use thiserror::Error;

/// Result type for neutralization and penalization.
pub type Result<T> = std::result::Result<T, ExposureError>;

/// Errors raised while transforming scores against feature exposures
#[derive(Debug, Error)]
pub enum ExposureError {
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Which operand did not line up
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// NaN or infinite input
    #[error("Non-finite values in {0}")]
    NonFinite(&'static str),

    /// Eigendecomposition did not reach the off-diagonal tolerance
    #[error("Eigendecomposition did not converge after {sweeps} sweeps")]
    NonConvergence {
        /// Jacobi sweeps performed
        sweeps: usize,
    },

    /// Optimizer produced a non-finite loss or weights
    #[error("Exposure optimizer diverged at iteration {iteration} (loss = {loss})")]
    Diverged {
        /// Iteration at which divergence was detected
        iteration: usize,
        /// Offending loss value
        loss: f64,
    },
}

impl ExposureError {
    /// Classify the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidParameter(_) | Self::DimensionMismatch { .. } => ErrorKind::Validation,
            Self::NonFinite(_) | Self::NonConvergence { .. } | Self::Diverged { .. } => {
                ErrorKind::Numerical
            }
        }
    }
}
