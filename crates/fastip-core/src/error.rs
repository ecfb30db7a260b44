//! Error types for fastip
//!
//! This module defines all error types used throughout the workspace.
//! Per-candidate probe failures are deliberately NOT errors: they are
//! reported as unreachable [`crate::ProbeOutcome`]s.

use thiserror::Error;

/// Result type alias for fastip operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fastip
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Candidate list could not be obtained (fatal)
    #[error("Candidate source error: {0}")]
    CandidateSource(String),

    /// DNS publish errors (reported, never fatal to probing)
    #[error("Publish error: {0}")]
    Publish(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed JSON configuration (fatal)
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed TOML configuration (fatal)
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a candidate source error
    pub fn candidate_source(msg: impl Into<String>) -> Self {
        Self::CandidateSource(msg.into())
    }

    /// Create a publish error
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error should abort the process
    ///
    /// Configuration and candidate-list errors are fatal; everything else is
    /// reported and the run continues.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::CandidateSource(_)
                | Self::Json(_)
                | Self::Toml(_)
                | Self::InvalidInput(_)
        )
    }
}
