//! Micro Server - application host for micro-engine records.
//!
//! This server exposes user and account endpoints over HTTP, backed by the
//! micro-engine record layer. Indexes are synchronized at startup, before
//! any request is served.

mod auth;
mod config;
mod error;
mod models;
mod routes;
mod session;

use crate::config::Config;
use crate::session::SessionStore;
use axum::Router;
use micro_engine::{Database, MemoryDriver};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    /// Open the database and synchronize every record type's indexes.
    pub fn new(config: Config) -> micro_engine::Result<Self> {
        let db = Database::new(MemoryDriver::new());
        models::ensure_indexes(&db, config.ensure_options())?;

        Ok(Self {
            db,
            config: Arc::new(config),
            sessions: SessionStore::new_shared(),
        })
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "micro_server=debug,micro_engine=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Micro Server on {}:{}", config.host, config.port);

    // Open storage and synchronize indexes
    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config)?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
