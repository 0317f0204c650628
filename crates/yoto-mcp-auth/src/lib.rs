//! Credential storage and device authorization for the Yoto API.
//!
//! This crate owns the credential lifecycle: one locally stored
//! access/refresh token pair for one operator, refreshed transparently and
//! obtained interactively via the OAuth device-authorization flow.
//!
//! # Storage Location
//!
//! The credential record is stored in the platform config directory:
//! - Linux: `~/.config/yoto-mcp/credentials.json`
//! - macOS: `~/Library/Application Support/yoto-mcp/credentials.json`
//! - Windows: `%APPDATA%/yoto-mcp/credentials.json`
//!
//! The file is created with restrictive permissions (0600 on Unix).
//!
//! # Example
//!
//! ```no_run
//! use yoto_mcp_auth::{AuthConfig, TokenProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::from_env()?;
//!     let provider = TokenProvider::new(config);
//!
//!     // Returns the stored token, refreshing it first if expired.
//!     let token = provider.access_token().await?;
//!     println!("bearer {token}");
//!     Ok(())
//! }
//! ```

mod config;
mod device;
mod error;
mod store;
mod token;

pub use config::AuthConfig;
pub use device::{DeviceAuthorizer, DeviceSession};
pub use error::{AuthError, AuthResult};
pub use store::{Credential, CredentialStore};
pub use token::TokenProvider;

/// Get the default credentials file path for the current platform.
///
/// Returns `None` if the config directory cannot be determined.
pub fn default_credentials_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|p| p.join("yoto-mcp").join("credentials.json"))
}

/// Get the current time in milliseconds since Unix epoch.
pub fn current_time_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
