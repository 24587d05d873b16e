//! Authentication extractors.
//!
//! A request is authenticated by the first credential that resolves to a
//! user, tried in this order:
//! 1. the `session_id` cookie, through the session store
//! 2. `Authorization: Bearer <token>` or `Authorization: Token <token>`
//! 3. `X-Api-Auth-Token: <token>`
//!
//! Tokens only resolve while they exist and have not expired.

use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use micro_engine::Record;
use serde_json::json;

use crate::error::AppError;
use crate::models::{Token, User};
use crate::session::{cookie_value, SESSION_COOKIE};
use crate::AppState;

const API_TOKEN_HEADER: &str = "x-api-auth-token";

/// The authenticated user, if any.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<Record<User>>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = user_from_session(parts, state)? {
            return Ok(CurrentUser(Some(user)));
        }

        let tokens = [bearer_token(parts), header_token(parts)];
        for token in tokens.into_iter().flatten() {
            if let Some(user) = Token::resolve_user(&state.db, token)? {
                return Ok(CurrentUser(Some(user)));
            }
        }

        Ok(CurrentUser(None))
    }
}

/// An authenticated user. Rejects anonymous requests with 403.
#[derive(Debug, Clone)]
pub struct RequireUser(pub Record<User>);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(CurrentUser(Some(user))) => Ok(RequireUser(user)),
            Ok(CurrentUser(None)) => Err(logged_out(state)),
            Err(e) => Err(e.into_response()),
        }
    }
}

fn logged_out(state: &AppState) -> Response {
    let body = json!({
        "errors": ["You must be authenticated first"],
        "state": "logged out",
        "auth_url": state.config.auth_url,
        "auth_text": state.config.auth_text,
    });
    (StatusCode::FORBIDDEN, Json(body)).into_response()
}

fn user_from_session(parts: &Parts, state: &AppState) -> Result<Option<Record<User>>, AppError> {
    let session_id = parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| cookie_value(header, SESSION_COOKIE));

    match session_id.and_then(|id| state.sessions.resolve(id)) {
        Some(user_id) => Ok(state.db.collection::<User>().get_by_id(user_id)?),
        None => Ok(None),
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.trim().split_once(' ')?;
    match scheme {
        "Bearer" | "Token" => Some(token.trim()).filter(|t| !t.is_empty()),
        _ => None,
    }
}

fn header_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(API_TOKEN_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
