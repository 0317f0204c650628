//! yoto-mcp - MCP server for Yoto MYO cards.
//!
//! This is the main entry point. With no subcommand the process serves
//! the MCP protocol on stdio; the `auth` subcommand drives the device
//! authorization flow from a terminal.

mod commands;
mod tools;

use clap::{Parser, Subcommand};
use commands::auth::AuthCommands;
use tracing::info;
use yoto_mcp_api::{ApiClient, ApiConfig};
use yoto_mcp_auth::AuthConfig;

#[derive(Parser)]
#[command(name = "yoto-mcp")]
#[command(author, version, about = "MCP server for Yoto MYO cards", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the MCP protocol on stdio (the default)
    Serve,
    /// Manage Yoto authentication
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Auth { command }) => commands::auth::handle_auth(command).await,
        Some(Commands::Serve) | None => serve().await,
    }
}

/// Serve the MCP protocol on stdio until the client disconnects.
async fn serve() -> anyhow::Result<()> {
    let auth_config = AuthConfig::from_env()?;
    let api = ApiClient::with_config(ApiConfig::from_env());

    let server = tools::build_server(auth_config, api);
    info!(tools = server.tool_count(), "Yoto MCP server running on stdio");

    server.serve_stdio().await?;
    Ok(())
}

/// Initialize logging based on verbosity.
///
/// Logs always go to stderr: stdout carries the JSON-RPC frames.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
