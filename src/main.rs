// Main entry point - Dependency injection and command dispatch
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::load_settings;
use crate::infrastructure::databricks_client::DatabricksClient;
use crate::presentation::app_state::AppState;
use crate::presentation::cli::Cli;
use crate::presentation::handlers::run_command;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is kept for reports and prompts
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let settings = load_settings(&cli.config)?;
    let credentials = settings.workspace.credentials()?;
    tracing::debug!("Loaded settings: {:?}", settings);

    // Create the workspace client (infrastructure layer), shared by every port
    let client = Arc::new(DatabricksClient::new(&credentials, &settings.workspace));

    // Services are built per command from the shared state (application layer)
    let state = AppState::new(settings, credentials.host.clone(), client);

    run_command(&state, cli.command).await
}
