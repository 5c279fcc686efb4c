//! # Social Hub
//!
//! Real-time chat connection hub for the social backend.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use social_hub::config::Settings;
use social_hub::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    social_hub::telemetry::init_tracing();

    info!("Starting Social Hub...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        outbox_capacity = settings.websocket.outbox_capacity,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Hub ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
