//! Error types for network loading.

use thiserror::Error;

/// Errors that can occur while loading a serialized network.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FrontendError {
    /// Syntax error in the serialized model.
    #[error("parse error: {0}")]
    ParseError(String),

    /// The text parsed but does not describe a valid discrete Bayesian network
    /// (unknown parent, cycle, wrong table size, rows that do not normalize, ...).
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Unknown serialization format tag.
    #[error("unsupported network format '{0}' (expected 'bif' or 'net')")]
    UnsupportedFormat(String),
}

impl FrontendError {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::ParseError(message.into())
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}
