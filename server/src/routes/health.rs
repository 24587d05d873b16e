//! Liveness and service description.

use axum::{extract::State, routing::get, Json, Router};
use micro_engine::Model;
use serde::Serialize;

use crate::models::{Token, User};
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Collections backing the served record types
    pub collections: [&'static str; 2],
    /// Where clients without credentials are sent
    pub auth_url: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        collections: [User::collection(), Token::collection()],
        auth_url: state.config.auth_url.clone(),
    })
}

async fn root() -> &'static str {
    "micro-server: users at /api/v1/users, account at /api/v1/account"
}
