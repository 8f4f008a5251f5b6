//! Error types for scangate-core

use thiserror::Error;

/// Result type alias using scangate-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause carried by wrapping variants
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error types for Scangate
#[derive(Error, Debug)]
pub enum Error {
    /// Image reference could not be parsed
    #[error("Invalid image reference '{input}': {message}")]
    Parse { input: String, message: String },

    /// Configuration (registry mirrors, config file) is malformed
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Registry hostname has no canonical name in the registry cache
    #[error("Registry not found in scanner registry table: {hostname}")]
    NotFound { hostname: String },

    /// Network or registry communication failure
    #[error("Transport error while resolving '{reference}': {source}")]
    Transport {
        reference: String,
        #[source]
        source: BoxError,
    },

    /// Manifest fetched but a required digest is missing
    #[error("Integrity error for '{reference}': missing {missing}")]
    Integrity { reference: String, missing: String },

    /// Caller cancelled the operation or its deadline elapsed
    #[error("Resolution of '{reference}' cancelled: {reason}")]
    Cancelled { reference: String, reason: String },

    /// Outbound request could not be signed
    #[error("Request signing failed: {message}")]
    Signing { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),
}

impl Error {
    /// Create a reference parse error
    pub fn parse(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a registry not found error
    pub fn not_found(hostname: impl Into<String>) -> Self {
        Self::NotFound {
            hostname: hostname.into(),
        }
    }

    /// Create a transport error wrapping the underlying cause
    pub fn transport(reference: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            reference: reference.into(),
            source: source.into(),
        }
    }

    /// Create an integrity error naming the missing digest
    pub fn integrity(reference: impl Into<String>, missing: impl Into<String>) -> Self {
        Self::Integrity {
            reference: reference.into(),
            missing: missing.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Create a signing error
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Whether the caller's reconciliation loop should retry with backoff.
    ///
    /// Only transport failures are transient; everything else is a hard
    /// failure for the input that produced it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether this is a registry cache miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
