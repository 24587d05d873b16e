//! In-memory browser sessions.

use dashmap::DashMap;
use micro_engine::ObjectId;
use std::sync::Arc;
use uuid::Uuid;

/// Name of the cookie carrying the session identifier.
pub const SESSION_COOKIE: &str = "session_id";

/// Maps session identifiers to the user they were opened for.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, ObjectId>,
}

impl SessionStore {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open a session for `user_id` and return its identifier.
    pub fn open(&self, user_id: ObjectId) -> String {
        let session_id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(session_id.clone(), user_id);
        tracing::debug!(%user_id, "opened session");
        session_id
    }

    pub fn resolve(&self, session_id: &str) -> Option<ObjectId> {
        self.sessions.get(session_id).map(|entry| *entry.value())
    }

    /// Close every session of a user.
    pub fn close_all(&self, user_id: ObjectId) {
        self.sessions.retain(|_, owner| *owner != user_id);
    }
}

/// `Set-Cookie` value opening a session.
pub fn session_cookie(session_id: &str) -> String {
    format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value clearing the session cookie.
pub fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Extract a cookie value from a `Cookie` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
