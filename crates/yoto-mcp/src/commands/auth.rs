//! Authentication command handlers.
//!
//! Lets the operator run the device authorization flow from a terminal
//! instead of through the MCP `yoto-auth` tool.

use clap::Subcommand;
use yoto_mcp_auth::{current_time_ms, AuthConfig, CredentialStore, DeviceAuthorizer};

/// Authentication subcommands.
#[derive(Subcommand)]
pub enum AuthCommands {
    /// Log in via the device authorization flow
    Login,
    /// Show authentication status
    Status,
    /// Delete the stored credential
    Logout,
}

/// Handle authentication commands.
pub async fn handle_auth(command: AuthCommands) -> anyhow::Result<()> {
    let config = AuthConfig::from_env()?;

    match command {
        AuthCommands::Login => auth_login(config).await,
        AuthCommands::Status => auth_status(config).await,
        AuthCommands::Logout => auth_logout(config).await,
    }
}

/// Run the device flow and persist the obtained credential.
async fn auth_login(config: AuthConfig) -> anyhow::Result<()> {
    let store = CredentialStore::new(config.credentials_path.clone());
    let credential = DeviceAuthorizer::new(config).run().await?;
    store.save(&credential).await?;

    println!();
    println!("✓ Logged in to Yoto.");
    println!("Credential file: {}", store.path().display());
    Ok(())
}

/// Show the stored credential state.
async fn auth_status(config: AuthConfig) -> anyhow::Result<()> {
    let store = CredentialStore::new(config.credentials_path);
    let credential = store.load().await;

    println!("Authentication status:");
    println!();

    match credential.usable_access_token(current_time_ms()) {
        Some(token) => {
            println!("  access token:  ✓ {}", mask_token(token));
            if let Some(expires_at) = credential.expires_at {
                println!("  expires:       {}", format_expiry(expires_at));
            }
        }
        None if credential.refresh_token.is_some() => {
            println!("  access token:  ✗ expired (will refresh on next call)");
        }
        None => {
            println!("  access token:  ✗ not authenticated");
        }
    }

    let refresh = if credential.refresh_token.is_some() {
        "present"
    } else {
        "absent"
    };
    println!("  refresh token: {refresh}");
    println!();
    println!("Credential file: {}", store.path().display());

    if credential.is_empty() {
        println!();
        println!("Run 'yoto-mcp auth login' to authenticate.");
    }

    Ok(())
}

/// Delete the stored credential.
async fn auth_logout(config: AuthConfig) -> anyhow::Result<()> {
    let store = CredentialStore::new(config.credentials_path);
    if store.clear().await? {
        println!("✓ Logged out from Yoto.");
    } else {
        println!("No stored credential.");
    }
    Ok(())
}

/// Mask a token for display.
fn mask_token(token: &str) -> String {
    if token.len() <= 8 {
        return "*".repeat(token.len());
    }
    let prefix = &token[..4];
    let suffix = &token[token.len() - 4..];
    format!("{prefix}...{suffix}")
}

/// Render an expiry timestamp (unix ms) as UTC.
fn format_expiry(expires_at_ms: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(expires_at_ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{expires_at_ms} ms"),
    }
}
