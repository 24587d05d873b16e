//! API tokens.

use chrono::Duration;
use micro_engine::{ApiError, Database, FieldDef, IndexDecl, Model, ObjectId, Record, Result, Schema};
use serde_json::{json, Value};
use std::sync::OnceLock;
use uuid::Uuid;

use super::{now, now_ms, User};

/// A bearer token granting API access on behalf of a user.
pub struct Token;

impl Model for Token {
    const NAME: &'static str = "Token";

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .field(
                    FieldDef::optional("token")
                        .rejected()
                        .default_with(|| json!(Uuid::new_v4().simple().to_string())),
                )
                .field(FieldDef::required("user_id"))
                .field(FieldDef::optional("created_at").rejected().default_with(|| json!(now_ms())))
                .field(FieldDef::optional("expires_at"))
                .key_field("token")
                .index(IndexDecl::from("token").unique(true))
                .index(IndexDecl::new(["user_id", "-created_at"]))
                .build()
        })
    }
}

impl Token {
    /// Issue and persist a token for `user_id` valid for `ttl_secs`.
    ///
    /// A lifetime whose expiry cannot be represented is rejected with a 400
    /// [`ApiError`].
    pub fn issue(db: &Database, user_id: ObjectId, ttl_secs: i64) -> Result<Record<Token>> {
        let expires_at = Duration::try_seconds(ttl_secs)
            .and_then(|ttl| now().checked_add_signed(ttl))
            .ok_or_else(|| ApiError::new(format!("token lifetime of {ttl_secs}s is out of range")))?
            .timestamp_millis();

        let mut token = Record::<Token>::new();
        token.set("user_id", user_id.to_value())?;
        token.set("expires_at", expires_at)?;
        token.save(db)?;
        tracing::debug!(user = %user_id, "issued token");
        Ok(token)
    }

    /// Whether the token's expiry lies in the past. Tokens without an expiry
    /// never expire.
    pub fn is_expired(token: &Record<Token>, now_ms: i64) -> bool {
        token
            .get("expires_at")
            .and_then(Value::as_i64)
            .is_some_and(|expires_at| expires_at <= now_ms)
    }

    /// The user a live token belongs to.
    pub fn resolve_user(db: &Database, token: &str) -> Result<Option<Record<User>>> {
        let Some(token) = db.collection::<Token>().find_one(json!({ "token": token }))? else {
            return Ok(None);
        };
        if Self::is_expired(&token, now_ms()) {
            return Ok(None);
        }
        match token.get("user_id").and_then(ObjectId::from_value) {
            Some(user_id) => db.collection::<User>().get_by_id(user_id),
            None => Ok(None),
        }
    }
}
