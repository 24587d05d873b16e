//! HTTP route definitions.

mod account;
mod health;
mod users;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(users::routes())
        .merge(account::routes())
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::{app, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
    }

    impl TestApp {
        fn new() -> Self {
            let config = Config::from_lookup(|_| None).unwrap();
            let state = AppState::new(config).unwrap();
            Self { router: app(state) }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            headers: &[(&str, &str)],
            body: Option<Value>,
        ) -> (StatusCode, Option<String>, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            for (name, value) in headers {
                request = request.header(*name, *value);
            }
            let request = match body {
                Some(body) => request
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => request.body(Body::empty()),
            }
            .unwrap();

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let cookie = response
                .headers()
                .get(header::SET_COOKIE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            (status, cookie, body)
        }

        /// Register a user and return its id and first API token.
        async fn register(&self, username: &str) -> (String, String) {
            let (status, _, body) = self
                .send(
                    Method::POST,
                    "/api/v1/users",
                    &[],
                    Some(json!({ "username": username })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            let id = body["data"]["_id"].as_str().unwrap().to_string();
            let token = body["token"].as_str().unwrap().to_string();
            (id, token)
        }
    }

    #[tokio::test]
    async fn health_and_root() {
        let app = TestApp::new();
        let (status, _, body) = app.send(Method::GET, "/health", &[], None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["collections"], json!(["user", "token"]));
        assert_eq!(body["auth_url"], "/login");

        let (status, _, _) = app.send(Method::GET, "/", &[], None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn anonymous_requests_are_told_to_log_in() {
        let app = TestApp::new();
        let (status, _, body) = app.send(Method::GET, "/api/v1/account/me", &[], None).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body,
            json!({
                "errors": ["You must be authenticated first"],
                "state": "logged out",
                "auth_url": "/login",
                "auth_text": "external auth",
            })
        );
    }

    #[tokio::test]
    async fn every_token_header_authenticates() {
        let app = TestApp::new();
        let (_, token) = app.register("alice").await;

        let bearer = format!("Bearer {token}");
        let legacy = format!("Token {token}");
        let headers: [(&str, &str); 3] = [
            ("authorization", bearer.as_str()),
            ("authorization", legacy.as_str()),
            ("x-api-auth-token", token.as_str()),
        ];
        for header in headers {
            let (status, _, body) = app
                .send(Method::GET, "/api/v1/account/me", &[header], None)
                .await;
            assert_eq!(status, StatusCode::OK, "{header:?}");
            assert_eq!(body["data"]["username"], "alice");
            assert!(body["data"].get("password_hash").is_none());
        }

        let (status, _, _) = app
            .send(
                Method::GET,
                "/api/v1/account/me",
                &[("authorization", "Bearer nope")],
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn session_cookie_round_trip() {
        let app = TestApp::new();
        let (id, token) = app.register("alice").await;

        let (status, cookie, _) = app
            .send(
                Method::POST,
                "/api/v1/account/session",
                &[("x-api-auth-token", token.as_str())],
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let cookie = cookie.unwrap();
        let pair = cookie.split(';').next().unwrap().to_string();
        assert!(pair.starts_with("session_id="));

        let (status, _, body) = app
            .send(Method::GET, "/api/v1/account/me", &[("cookie", pair.as_str())], None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["_id"], id.as_str());

        let (status, _, _) = app
            .send(Method::DELETE, "/api/v1/account/session", &[("cookie", pair.as_str())], None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = app
            .send(Method::GET, "/api/v1/account/me", &[("cookie", pair.as_str())], None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn issued_tokens_authenticate() {
        let app = TestApp::new();
        let (id, bootstrap) = app.register("alice").await;

        let (status, _, body) = app
            .send(
                Method::POST,
                "/api/v1/account/tokens",
                &[("x-api-auth-token", bootstrap.as_str())],
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let issued = body["data"]["token"].as_str().unwrap().to_string();
        assert_ne!(issued, bootstrap);
        assert_eq!(body["data"]["user_id"], id.as_str());

        let (status, _, _) = app
            .send(
                Method::GET,
                "/api/v1/account/me",
                &[("x-api-auth-token", issued.as_str())],
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn registration_validates_and_rejects_duplicates() {
        let app = TestApp::new();
        app.register("alice").await;

        let (status, _, body) = app
            .send(
                Method::POST,
                "/api/v1/users",
                &[],
                Some(json!({ "username": "alice" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("username"));

        let (status, _, body) = app
            .send(Method::POST, "/api/v1/users", &[], Some(json!({ "email": "x@y.z" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "field required: username" }));

        let (status, _, _) = app
            .send(
                Method::POST,
                "/api/v1/users",
                &[],
                Some(json!({ "username": "bob", "tags": "admin" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn users_by_id_or_username() {
        let app = TestApp::new();
        let (id, token) = app.register("alice").await;
        let auth = [("x-api-auth-token", token.as_str())];

        for path in [format!("/api/v1/users/{id}"), "/api/v1/users/alice".to_string()] {
            let (status, _, body) = app.send(Method::GET, &path, &auth, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"]["_id"], id.as_str());
        }

        let (status, _, body) = app
            .send(Method::GET, "/api/v1/users/nobody", &auth, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "user nobody not found" }));
    }

    #[tokio::test]
    async fn users_edit_only_themselves() {
        let app = TestApp::new();
        let (alice, token) = app.register("alice").await;
        let (bob, _) = app.register("bob").await;
        let auth = [("x-api-auth-token", token.as_str())];

        let (status, _, body) = app
            .send(
                Method::PATCH,
                &format!("/api/v1/users/{alice}"),
                &auth,
                Some(json!({ "first_name": "Alice", "created_at": 0, "tags": ["ops"] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["first_name"], "Alice");
        assert_eq!(body["data"]["tags"], json!(["ops"]));
        assert_ne!(body["data"]["created_at"], 0);

        let (status, _, _) = app
            .send(
                Method::PATCH,
                &format!("/api/v1/users/{bob}"),
                &auth,
                Some(json!({ "first_name": "Mallory" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, _) = app
            .send(Method::DELETE, &format!("/api/v1/users/{bob}"), &auth, None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn deleting_an_account_revokes_its_credentials() {
        let app = TestApp::new();
        let (id, token) = app.register("alice").await;
        let auth = [("x-api-auth-token", token.as_str())];

        let (status, _, _) = app
            .send(Method::DELETE, &format!("/api/v1/users/{id}"), &auth, None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = app.send(Method::GET, "/api/v1/account/me", &auth, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_bodies_get_a_json_error() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("JSON"));
        assert_eq!(body.as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn registration_token_authenticates() {
        let app = TestApp::new();
        let (id, token) = app.register("alice").await;

        let (status, _, body) = app
            .send(
                Method::GET,
                "/api/v1/account/me",
                &[("x-api-auth-token", token.as_str())],
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["_id"], id.as_str());
    }
}
