//! Error Types
//!
//! Typed failures shared by every service client and helper.

use thiserror::Error;

/// Main error type for stac-utils operations
#[derive(Debug, Error)]
pub enum StacError {
    /// Configuration errors (invalid JSON, bad values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A credential or setting a service needs was not provided
    #[error("Missing credential '{field}' for '{service}'. Set it in the config file or via {env_hint}")]
    MissingCredential {
        service: String,
        field: String,
        env_hint: String,
    },

    /// Authentication failed or could not be refreshed
    #[error("Authentication failed for '{service}': {message}")]
    Auth { service: String, message: String },

    /// Rate limit exceeded and the client is not allowed to wait it out
    #[error("Rate limited by '{service}'{}", retry_hint(.retry_after))]
    RateLimited {
        service: String,
        retry_after: Option<u64>,
    },

    /// The API answered with a non-success status or an error envelope
    #[error("'{service}' returned status {status}: {detail}")]
    Api {
        service: String,
        status: u16,
        detail: serde_json::Value,
    },

    /// NGP VAN signup against an event that still needs a location
    #[error("Event requires a location before signups: {0}")]
    EventLocationRequired(serde_json::Value),

    /// HTTP request failed before a response arrived
    #[error("Request failed: {0}")]
    Request(String),

    /// Response could not be decoded
    #[error("Response error: {0}")]
    Response(String),

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Input string could not be parsed into the requested type
    #[error("Parse error: {0}")]
    Parse(String),

    /// Arguments that cannot make a valid request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Secrets could not be loaded or stored
    #[error("Secrets error: {0}")]
    Secrets(String),

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(seconds) => format!(", retry after {} seconds", seconds),
        None => String::new(),
    }
}

impl StacError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            StacError::Api { status, .. } => Some(*status),
            StacError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether this is the authentication/rate-limit family of failures
    pub fn is_auth_or_rate_limit(&self) -> bool {
        matches!(self, StacError::Auth { .. } | StacError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for StacError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StacError::Timeout(err.to_string())
        } else if err.is_connect() {
            StacError::Request(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            StacError::Response(format!("Failed to decode response: {}", err))
        } else {
            StacError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StacError {
    fn from(err: serde_json::Error) -> Self {
        StacError::Response(format!("JSON parsing error: {}", err))
    }
}

/// Result type alias for stac-utils operations
pub type Result<T> = std::result::Result<T, StacError>;
