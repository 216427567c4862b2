//! # Chitter Server
//!
//! Application entry point: initializes tracing, loads configuration,
//! selects the storage backend, and runs the HTTP server until stopped.

use anyhow::Result;
use tracing::info;

use chitter::config::Settings;
use chitter::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    chitter::telemetry::init_tracing();

    info!("Starting Chitter...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        backend = ?settings.backend(),
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
