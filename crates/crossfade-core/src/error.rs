//! Error types for Crossfade.
//!
//! This module provides a unified error type for all Crossfade operations,
//! with specific error variants for different failure modes.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for Crossfade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Crossfade.
#[derive(Error, Debug)]
pub enum Error {
    /// Request could not complete (connection refused, reset, DNS, ...)
    #[error("network error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("server rejected request ({status}): {message}")]
    RemoteRejection {
        /// HTTP status code
        status: u16,
        /// Message provided by the server
        message: String,
    },

    /// Credential login was refused
    #[error("login to {service} failed: {message}")]
    LoginFailed {
        /// Service the login was for
        service: String,
        /// Reason reported by the server
        message: String,
    },

    /// Credential-based service was asked to authenticate without credentials
    #[error("{0} requires an email and password")]
    CredentialsRequired(String),

    /// Service id is not in the registry
    #[error("unknown service '{0}'")]
    UnknownService(String),

    /// Service exists but is disabled in the configuration
    #[error("service '{0}' is disabled")]
    ServiceDisabled(String),

    /// Playlist id is not in the source listing
    #[error("no playlist '{id}' on {service}")]
    UnknownCollection {
        /// Service that was searched
        service: String,
        /// Requested playlist id
        id: String,
    },

    /// Service is not authenticated
    #[error("service '{0}' is not connected")]
    NotConnected(String),

    /// Source and destination are the same service
    #[error("cannot transfer from '{0}' to itself")]
    SameService(String),

    /// Nothing is selected
    #[error("no playlists selected")]
    EmptySelection,

    /// A run is active or still inside its completion window
    #[error("a transfer run is already in progress")]
    RunInProgress,

    /// Operation timeout
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Internal error (should not happen)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl Error {
    /// Message recorded in a failed job result.
    ///
    /// Server-provided messages are passed through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteRejection { message, .. } | Self::LoginFailed { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// Returns whether this error is recoverable (can be retried).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_) | Self::RunInProgress)
    }

    /// Returns a helpful suggestion for resolving the error, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Network(_) => Some(
                "Check that the transfer backend is running and reachable.\n\
                 The server URL can be changed with --server or in the config file.",
            ),
            Self::NotConnected(_) => Some("Connect the service first:\n  crossfade connect <service>"),
            Self::CredentialsRequired(_) => {
                Some("Pass --email and --password, or set CROSSFADE_PASSWORD.")
            }
            Self::UnknownCollection { .. } => {
                Some("List available playlists with 'crossfade playlists'.")
            }
            Self::EmptySelection => {
                Some("Pass playlist ids, --all, or --interactive to pick playlists.")
            }
            Self::ConfigError(_) | Self::InvalidConfig { .. } => {
                Some("Inspect the file with 'crossfade config show' or reset it with 'crossfade config reset'.")
            }
            _ => None,
        }
    }
}
