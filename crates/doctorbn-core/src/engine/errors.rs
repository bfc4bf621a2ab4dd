//! Error types for DoctorBN computations.

use thiserror::Error;

impl From<doctorbn_frontend::FrontendError> for ExecError {
    fn from(err: doctorbn_frontend::FrontendError) -> Self {
        match err {
            doctorbn_frontend::FrontendError::ParseError(msg) => ExecError::ParseError(msg),
            doctorbn_frontend::FrontendError::ValidationError(msg) => {
                ExecError::ValidationError(msg)
            }
            doctorbn_frontend::FrontendError::UnsupportedFormat(_) => {
                ExecError::ParseError(err.to_string())
            }
            _ => ExecError::Internal(format!("unexpected frontend error: {:?}", err)),
        }
    }
}

/// Errors that can occur while validating a scenario or computing over it.
///
/// Every operation aborts on the first error; no partial result is returned
/// alongside one. This enum is marked `#[non_exhaustive]` so new variants can be
/// added without breaking callers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExecError {
    /// Malformed serialized model, surfaced from the network loader.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Malformed scenario shape or configuration.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A referenced variable does not exist in the network.
    #[error("validation error: unknown variable '{variable}'")]
    UnknownVariable { variable: String },

    /// A referenced state does not exist for its variable.
    #[error("validation error: variable '{variable}' has no state '{state}'")]
    UnknownState { variable: String, state: String },

    /// The inference oracle rejected a query (e.g. zero-probability evidence).
    #[error("inference error: {0}")]
    Inference(String),

    /// Numerical problem in a table (NaN/Inf, mass that does not normalize).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Internal error (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecError {
    /// The variable an error is about, when it names one.
    pub fn variable(&self) -> Option<&str> {
        match self {
            Self::UnknownVariable { variable } | Self::UnknownState { variable, .. } => {
                Some(variable)
            }
            _ => None,
        }
    }
}
