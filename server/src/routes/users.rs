//! User management endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use micro_engine::{ApiError, Document, Record};
use serde_json::{json, Value};

use crate::auth::RequireUser;
use crate::error::Result;
use crate::models::{Token, User};
use crate::AppState;

/// Create user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/users", post(create_user))
        .route(
            "/api/v1/users/{id}",
            get(show_user).patch(update_user).delete(delete_user),
        )
}

fn user_body(user: &Record<User>) -> Json<Value> {
    Json(json!({ "data": user.to_dict(None, false) }))
}

fn find_user(state: &AppState, id: &str) -> Result<Record<User>> {
    state
        .db
        .collection::<User>()
        .get(id)?
        .ok_or_else(|| ApiError::not_found(format!("user {id} not found")).into())
}

fn ensure_self(current: &Record<User>, target: &Record<User>) -> Result<()> {
    if current.id() != target.id() {
        return Err(ApiError::new("you can only modify your own account")
            .with_status(403)
            .into());
    }
    Ok(())
}

/// Register a user from the declared, non-rejected fields of the body.
///
/// The response carries a first API token under `"token"`, since every other
/// way to obtain a credential requires one.
async fn create_user(
    State(state): State<AppState>,
    body: std::result::Result<Json<Document>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(body) = body?;
    let mut user = Record::<User>::new();
    user.update(&state.db, &body)?;
    let token = Token::issue(&state.db, user.require_saved()?, state.config.token_ttl_secs)?;
    tracing::info!(username = user.get_str("username"), "user created");

    let body = json!({
        "data": user.to_dict(None, false),
        "token": token.get_str("token"),
    });
    Ok((StatusCode::CREATED, Json(body)))
}

async fn show_user(
    State(state): State<AppState>,
    RequireUser(_): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let user = find_user(&state, &id)?;
    Ok(user_body(&user))
}

async fn update_user(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<String>,
    patch: std::result::Result<Json<Document>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(patch) = patch?;
    let mut user = find_user(&state, &id)?;
    ensure_self(&current, &user)?;
    user.update(&state.db, &patch)?;
    Ok(user_body(&user))
}

async fn delete_user(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let mut user = find_user(&state, &id)?;
    ensure_self(&current, &user)?;
    let user_id = user.require_saved()?;

    user.destroy(&state.db)?;
    state.sessions.close_all(user_id);
    Ok(user_body(&user))
}
