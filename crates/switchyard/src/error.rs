//! Error types for the client framework.

use std::path::PathBuf;

use switchyard_net::NetworkError;

/// Result type alias for Switchyard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by a callback hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving, executing or stubbing operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No endpoint registered under this service name.
    #[error("Service `{name}` is not registered")]
    EndpointNotFound { name: String },

    /// No operation file matched the name.
    #[error("Operation `{operation}` not found for `{client}` (searched: {searched})")]
    OperationNotFound {
        client: String,
        operation: String,
        searched: String,
    },

    /// Fixture file or fixture key missing.
    #[error("{0}")]
    FixtureNotFound(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A GraphQL, YAML, JSON or TOML file could not be parsed.
    #[error("Failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// Schema could not be loaded.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The definition cannot be executed (fragment or subscription).
    #[error("Operation `{operation}` cannot be executed: {reason}")]
    InvalidOperation { operation: String, reason: String },

    /// Variables did not serialize to a JSON object.
    #[error("Invalid variables: {0}")]
    InvalidVariables(String),

    /// Required variables were not supplied.
    #[error("Operation `{operation}` is missing required variables: {}", .variables.join(", "))]
    MissingVariable {
        operation: String,
        variables: Vec<String>,
    },

    /// A before or after hook failed.
    #[error("Callback failed: {0}")]
    Callback(#[source] HookError),

    /// File I/O error.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport error.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl Error {
    /// Create an endpoint lookup error.
    pub fn endpoint_not_found(name: impl Into<String>) -> Self {
        Self::EndpointNotFound { name: name.into() }
    }

    /// Create a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid-operation error.
    pub fn invalid_operation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a transport timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_timeout())
    }

    /// Whether this is a 5xx answer from the server.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_server_error())
    }
}
