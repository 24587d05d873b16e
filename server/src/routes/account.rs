//! Endpoints about the authenticated account.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use micro_engine::Record;
use serde_json::{json, Value};

use crate::auth::RequireUser;
use crate::error::Result;
use crate::models::{Token, User};
use crate::session::{expired_cookie, session_cookie};
use crate::AppState;

/// Create account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/account/me", get(me))
        .route("/api/v1/account/tokens", post(issue_token))
        .route("/api/v1/account/session", post(open_session).delete(close_session))
}

fn me_body(user: &Record<User>) -> Json<Value> {
    Json(json!({ "data": user.to_dict(None, false) }))
}

async fn me(RequireUser(user): RequireUser) -> Json<Value> {
    me_body(&user)
}

async fn issue_token(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<(StatusCode, Json<Value>)> {
    let token = Token::issue(&state.db, user.require_saved()?, state.config.token_ttl_secs)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": token.to_dict(None, false) })),
    ))
}

/// Exchange a token-authenticated request for a cookie session.
async fn open_session(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    let session_id = state.sessions.open(user.require_saved()?);
    Ok(([(SET_COOKIE, session_cookie(&session_id))], me_body(&user)).into_response())
}

/// Close every session of the authenticated user.
async fn close_session(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Response> {
    state.sessions.close_all(user.require_saved()?);
    Ok((
        [(SET_COOKIE, expired_cookie())],
        Json(json!({ "state": "logged out" })),
    )
        .into_response())
}
