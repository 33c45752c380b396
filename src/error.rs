//! Error types for the demandcast library.

use thiserror::Error;

/// Result type alias for forecasting and optimization operations.
pub type Result<T> = std::result::Result<T, DemandError>;

/// Errors that can occur during preprocessing, forecasting, or optimization.
///
/// The taxonomy follows the propagation policy of the pipeline: validation
/// errors abort a request before any model runs, model-fit errors are caught
/// per model so the remaining models proceed, and configuration errors abort
/// only the optimization call that received the bad parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DemandError {
    /// Input data is malformed (missing columns, unparseable values).
    #[error("validation error: {0}")]
    Validation(String),

    /// Not enough historical points for the operation.
    #[error("insufficient history: need at least {needed} points, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// A single model's fit or prediction failed.
    #[error("model fit failed for {model}: {reason}")]
    ModelFit { model: String, reason: String },

    /// Invalid business parameters supplied to the optimizer.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before forecasting")]
    FitRequired,

    /// Two aligned sequences have different lengths.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Reading input data failed. Stored as a message so the error type
    /// stays clonable and comparable.
    #[error("io error: {0}")]
    Io(String),
}

impl DemandError {
    /// Wrap any failure reason as a model-fit error for the named model.
    pub fn model_fit(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelFit {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that abort the whole request rather than one model.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ModelFit { .. })
    }
}
