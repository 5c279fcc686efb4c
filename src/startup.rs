//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::domain::{AuthClient, ChatUsecase};
use crate::infrastructure::auth::JwtAuthClient;
use crate::infrastructure::repositories::InMemoryChatRepository;
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::Hub;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub auth: Arc<dyn AuthClient>,
    pub chat: Arc<dyn ChatUsecase>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    hub: Arc<Hub>,
}

impl Application {
    /// Build the application with the default collaborators: JWT
    /// verification against the configured secret and the in-memory chat
    /// repository.
    pub async fn build(settings: Settings) -> Result<Self> {
        let auth = Arc::new(JwtAuthClient::new(&settings.jwt.secret));
        let chat = Arc::new(InMemoryChatRepository::new());
        Self::build_with(settings, auth, chat).await
    }

    /// Build the application around caller-supplied collaborators.
    pub async fn build_with(
        settings: Settings,
        auth: Arc<dyn AuthClient>,
        chat: Arc<dyn ChatUsecase>,
    ) -> Result<Self> {
        health::init_server_start();

        let hub = Arc::new(Hub::new());

        let state = AppState {
            hub: hub.clone(),
            auth,
            chat,
            settings: Arc::new(settings.clone()),
        };

        // Build router with middleware
        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        let addr = settings.server_addr();
        let listener = TcpListener::bind(addr.as_str())
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            hub,
        })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The connection hub serving this application
    pub fn hub(&self) -> Arc<Hub> {
        self.hub.clone()
    }
}
