//! Error types for credential operations.

use thiserror::Error;

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur during credential operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable credential and refresh not possible; the operator must
    /// run the interactive device authorization flow.
    #[error("Authentication required. Please run the yoto-auth tool first.")]
    AuthRequired,

    /// The interactive device flow exceeded its polling budget.
    #[error("Authentication timed out")]
    AuthTimeout,

    /// Failed to read or write the credential file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize credential data.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport failure talking to the authorization server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Could not determine the config directory.
    #[error("Could not determine config directory")]
    NoConfigDir,
}
