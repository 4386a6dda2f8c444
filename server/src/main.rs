mod api;
mod config;
mod display;
mod pages;
mod session;
mod websocket;

use std::sync::Arc;

use axum::Router;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::session::DeviceState;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub device_state: DeviceState,
    /// Broadcast channel for UI updates
    pub ui_broadcast: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let (ui_broadcast, _) = broadcast::channel(100);
        Self {
            config,
            device_state: DeviceState::new(),
            ui_broadcast,
        }
    }
}

/// Build the full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(pages::router())
        .nest("/api", api::router())
        .nest("/ws", websocket::router())
        .fallback(pages::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "tagportal_server=debug,tagportal_shared=debug,tower_http=debug".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    let state = Arc::new(AppState::new(config.clone()));

    // Clears the active card once its display time is over
    session::spawn_expiry_task(state.clone());

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!("TagPortal server listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
