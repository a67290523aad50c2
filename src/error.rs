//! Error types for profile-dash

use thiserror::Error;

/// Result type alias for profile-dash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single GraphQL request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// No usable response (connection refused, DNS, unreadable body)
    #[error("Network error: {0}. Check the console and try again.")]
    Transport(String),

    /// Non-2xx response
    #[error("GraphQL request failed: {status} {message}")]
    HttpStatus { status: u16, message: String },

    /// 2xx response carrying a non-empty `errors` list
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQL(Vec<String>),
}

/// Main error type for profile-dash
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Unexpected response shape: {0}")]
    DataShape(String),

    #[error("Login failed: {status} {message}")]
    SignIn { status: u16, message: String },

    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),
}
