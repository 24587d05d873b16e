//! Application users.

use micro_engine::{
    validate, Database, Document, FieldDef, IndexDecl, Model, Record, Result, Schema,
};
use serde_json::{json, Value};
use std::sync::OnceLock;

use super::{now_ms, Token};

/// A user account, looked up by `username`.
pub struct User;

impl Model for User {
    const NAME: &'static str = "User";

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .field(FieldDef::required("username"))
                .field(FieldDef::optional("first_name").default_value(""))
                .field(FieldDef::optional("last_name").default_value(""))
                .field(FieldDef::optional("email"))
                .field(FieldDef::optional("password_hash").rejected().restricted())
                .field(FieldDef::optional("tags").default_value(json!([])))
                .field(FieldDef::optional("custom_fields").default_value(json!([])))
                .field(FieldDef::optional("created_at").rejected().default_with(|| json!(now_ms())))
                .field(FieldDef::optional("updated_at").rejected())
                .key_field("username")
                .index(IndexDecl::from("username").unique(true))
                .index("-created_at")
                .index(IndexDecl::from("email").sparse(true))
                .index("tags")
                .build()
        })
    }

    fn before_save(record: &mut Record<Self>, _db: &Database) -> Result<()> {
        validate::tags(record.get("tags").unwrap_or(&Value::Null))?;
        validate::custom_fields(record.get("custom_fields").unwrap_or(&Value::Null))?;
        record.set("updated_at", now_ms())
    }

    fn before_delete(record: &mut Record<Self>, db: &Database) -> Result<()> {
        let id = record.require_saved()?;
        let mut query = Document::new();
        query.insert("user_id".into(), id.to_value());
        let removed = db.driver().delete_by_query(Token::collection(), &query)?;
        tracing::debug!(user = %id, removed, "revoked tokens of deleted user");
        Ok(())
    }
}
