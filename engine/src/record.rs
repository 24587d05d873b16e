//! Record types and instances.
//!
//! A record type is any Rust type implementing [`Model`]: it names itself,
//! exposes its static [`Schema`], and may override the lifecycle hooks. A
//! [`Record`] is one in-memory instance of such a type: an optional identity
//! plus exactly the declared fields as JSON values.

use crate::database::Database;
use crate::driver::Document;
use crate::id::{ObjectId, ID_FIELD};
use crate::schema::{FieldDef, Schema};
use crate::{error::Result, naming, Error};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// A record type.
///
/// Hooks run synchronously around persistence and default to no-ops. A hook
/// error aborts the remaining lifecycle steps.
///
/// ```rust
/// use micro_engine::{FieldDef, Model, Schema};
/// use std::sync::OnceLock;
///
/// struct UserToken;
///
/// impl Model for UserToken {
///     const NAME: &'static str = "UserToken";
///
///     fn schema() -> &'static Schema {
///         static SCHEMA: OnceLock<Schema> = OnceLock::new();
///         SCHEMA.get_or_init(|| {
///             Schema::builder()
///                 .field(FieldDef::required("token"))
///                 .key_field("token")
///                 .build()
///         })
///     }
/// }
///
/// assert_eq!(UserToken::collection(), "user_token");
/// ```
pub trait Model: Sized + 'static {
    /// Declared CamelCase type name.
    const NAME: &'static str;

    /// Field registry for this type.
    fn schema() -> &'static Schema;

    /// Storage collection, derived from [`Model::NAME`] once per type.
    fn collection() -> &'static str {
        naming::collection_name::<Self>(Self::NAME)
    }

    fn before_save(_record: &mut Record<Self>, _db: &Database) -> Result<()> {
        Ok(())
    }

    fn after_save(_record: &mut Record<Self>, _db: &Database) -> Result<()> {
        Ok(())
    }

    fn before_delete(_record: &mut Record<Self>, _db: &Database) -> Result<()> {
        Ok(())
    }

    fn after_delete(_record: &mut Record<Self>, _db: &Database) -> Result<()> {
        Ok(())
    }
}

/// An instance of the record type `M`.
pub struct Record<M: Model> {
    /// Storage-assigned identity, `None` until first saved
    pub(crate) id: Option<ObjectId>,
    /// Every declared field except the identity
    pub(crate) values: Document,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Record<M> {
    /// Create an instance with every field defaulted.
    pub fn new() -> Self {
        Self::with_values(Document::new())
    }

    /// Create an instance from initial values.
    ///
    /// Undeclared keys are ignored. Declared fields not supplied are filled
    /// from their default. A supplied `_id` is kept only if it is a valid
    /// identity.
    pub fn with_values(mut values: Document) -> Self {
        let id = values.get(ID_FIELD).and_then(ObjectId::from_value);

        let mut fields = Document::new();
        for field in M::schema().fields() {
            if field.name == ID_FIELD {
                continue;
            }
            let value = values
                .remove(&field.name)
                .unwrap_or_else(|| field.default.produce());
            fields.insert(field.name.clone(), value);
        }

        Self {
            id,
            values: fields,
            _model: PhantomData,
        }
    }

    /// The record type's schema.
    pub fn schema(&self) -> &'static Schema {
        M::schema()
    }

    /// The record type's collection.
    pub fn collection(&self) -> &'static str {
        M::collection()
    }

    /// Storage identity, if saved.
    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    /// Whether the instance has never been persisted.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// The identity, or [`Error::ObjectSaveRequired`] for a new instance.
    pub fn require_saved(&self) -> Result<ObjectId> {
        self.id.ok_or_else(|| {
            Error::ObjectSaveRequired(format!("{} must be saved first", M::NAME))
        })
    }

    /// Value of a declared field. The identity is read with [`Record::id`].
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// String value of a declared field.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Mutable access to a declared field.
    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.values.get_mut(field)
    }

    /// Overwrite a declared field.
    ///
    /// Writing `_id` accepts a hex identity or `null`.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if field == ID_FIELD {
            self.id = match &value {
                Value::Null => None,
                other => Some(
                    ObjectId::from_value(other)
                        .ok_or_else(|| Error::InvalidId(other.to_string()))?,
                ),
            };
            return Ok(());
        }

        match self.values.get_mut(field) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::UnknownField {
                model: M::NAME,
                field: field.to_string(),
            }),
        }
    }

    /// Required fields that are null or empty, in declaration order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        M::schema()
            .required_fields()
            .filter(|f| {
                if f.name == ID_FIELD {
                    self.id.is_none()
                } else {
                    FieldDef::is_missing(self.values.get(&f.name))
                }
            })
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Whether every required field is present and non-empty.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Serialize to a field map.
    ///
    /// `fields` defaults to every declared field. Fields whose name starts
    /// with `_` are skipped, except the identity, which is emitted as its hex
    /// form or `null`. Restricted fields are skipped unless
    /// `include_restricted` is set. Names that are not declared are skipped.
    pub fn to_dict(&self, fields: Option<&[&str]>, include_restricted: bool) -> Document {
        let schema = M::schema();
        let names: Vec<&str> = match fields {
            Some(fields) => fields.to_vec(),
            None => schema.field_names().collect(),
        };

        let mut result = Document::new();
        for name in names {
            if name == ID_FIELD {
                let id = self.id.map(|id| id.to_value()).unwrap_or(Value::Null);
                result.insert(ID_FIELD.to_string(), id);
                continue;
            }
            if name.starts_with('_') {
                continue;
            }
            if !include_restricted && schema.is_restricted(name) {
                continue;
            }
            if let Some(value) = self.values.get(name) {
                result.insert(name.to_string(), value.clone());
            }
        }
        result
    }

    /// The document handed to the storage driver: every declared field
    /// except the identity, restricted fields included.
    pub fn to_document(&self) -> Document {
        self.values.clone()
    }
}

impl<M: Model> Default for Record<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Record<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            values: self.values.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> PartialEq for Record<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.values == other.values
    }
}

impl<M: Model> fmt::Debug for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", M::NAME)?;
        for (i, name) in M::schema().field_names().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if name == ID_FIELD {
                match self.id {
                    Some(id) => write!(f, "{name}={id}")?,
                    None => write!(f, "{name}=null")?,
                }
            } else {
                let value = self.values.get(name).unwrap_or(&Value::Null);
                write!(f, "{name}={value}")?;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::OnceLock;

    struct Account;

    impl Model for Account {
        const NAME: &'static str = "Account";

        fn schema() -> &'static Schema {
            static SCHEMA: OnceLock<Schema> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::builder()
                    .field(FieldDef::required("login"))
                    .field(FieldDef::required("email"))
                    .field(FieldDef::optional("secret").restricted())
                    .field(FieldDef::optional("_cache"))
                    .field(FieldDef::optional("tags").default_value(json!([])))
                    .field(FieldDef::optional("serial").default_with(|| json!(7)))
                    .key_field("login")
                    .build()
            })
        }
    }

    fn values(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn construct_applies_defaults() {
        let account = Record::<Account>::new();
        assert!(account.is_new());
        assert_eq!(account.get("login"), Some(&Value::Null));
        assert_eq!(account.get("tags"), Some(&json!([])));
        assert_eq!(account.get("serial"), Some(&json!(7)));
    }

    #[test]
    fn construct_ignores_undeclared_and_keeps_supplied() {
        let account = Record::<Account>::with_values(values(json!({
            "login": "alice",
            "tags": ["ops"],
            "nickname": "al",
        })));
        assert_eq!(account.get_str("login"), Some("alice"));
        assert_eq!(account.get("tags"), Some(&json!(["ops"])));
        assert_eq!(account.get("nickname"), None);
    }

    #[test]
    fn supplied_identity() {
        let id = ObjectId::new();
        let account = Record::<Account>::with_values(values(json!({"_id": id.to_string()})));
        assert_eq!(account.id(), Some(id));
        assert!(!account.is_new());

        let bogus = Record::<Account>::with_values(values(json!({"_id": "not-an-id"})));
        assert!(bogus.is_new());
    }

    #[test]
    fn default_containers_are_not_shared() {
        let mut a = Record::<Account>::new();
        let b = Record::<Account>::new();
        a.get_mut("tags")
            .and_then(Value::as_array_mut)
            .unwrap()
            .push(json!("mutated"));
        assert_eq!(a.get("tags"), Some(&json!(["mutated"])));
        assert_eq!(b.get("tags"), Some(&json!([])));
    }

    #[test]
    fn set_rejects_undeclared_fields() {
        let mut account = Record::<Account>::new();
        account.set("login", "bob").unwrap();
        assert_eq!(account.get_str("login"), Some("bob"));

        let err = account.set("nickname", "b").unwrap_err();
        assert_eq!(
            err,
            Error::UnknownField {
                model: "Account",
                field: "nickname".into()
            }
        );
    }

    #[test]
    fn set_identity() {
        let mut account = Record::<Account>::new();
        let id = ObjectId::new();
        account.set("_id", id.to_string()).unwrap();
        assert_eq!(account.id(), Some(id));
        account.set("_id", Value::Null).unwrap();
        assert!(account.is_new());
        assert!(matches!(account.set("_id", "zz"), Err(Error::InvalidId(_))));
    }

    #[test]
    fn missing_fields_in_declaration_order() {
        let mut account = Record::<Account>::new();
        assert_eq!(account.missing_fields(), vec!["login", "email"]);
        assert!(!account.is_complete());

        account.set("email", "").unwrap();
        account.set("login", "carol").unwrap();
        assert_eq!(account.missing_fields(), vec!["email"]);

        account.set("email", "carol@example.com").unwrap();
        assert!(account.is_complete());
    }

    #[test]
    fn to_dict_filters() {
        let mut account = Record::<Account>::new();
        account.set("secret", "s3cr3t").unwrap();
        account.set("_cache", "warm").unwrap();

        let dict = account.to_dict(None, false);
        assert_eq!(dict.get("_id"), Some(&Value::Null));
        assert!(dict.contains_key("login"));
        assert!(dict.contains_key("tags"));
        assert!(!dict.contains_key("secret"));
        assert!(!dict.contains_key("_cache"));

        let full = account.to_dict(None, true);
        assert_eq!(full.get("secret"), Some(&json!("s3cr3t")));

        let picked = account.to_dict(Some(&["login", "undeclared", "secret"]), false);
        assert_eq!(picked.keys().collect::<Vec<_>>(), vec!["login"]);
    }

    #[test]
    fn to_document_excludes_identity() {
        let mut account = Record::<Account>::new();
        account.id = Some(ObjectId::new());
        account.set("secret", "x").unwrap();
        let doc = account.to_document();
        assert!(!doc.contains_key("_id"));
        assert_eq!(doc.get("secret"), Some(&json!("x")));
    }

    #[test]
    fn equality_covers_every_field() {
        let mut a = Record::<Account>::new();
        let mut b = Record::<Account>::new();
        assert_eq!(a, b);

        a.set("login", "dave").unwrap();
        assert_ne!(a, b);
        b.set("login", "dave").unwrap();
        assert_eq!(a, b);

        b.id = Some(ObjectId::new());
        assert_ne!(a, b);
    }

    #[test]
    fn debug_lists_fields() {
        let mut account = Record::<Account>::new();
        account.set("login", "erin").unwrap();
        let repr = format!("{:?}", account);
        assert!(repr.starts_with("Account(_id=null, login=\"erin\", email=null"));
    }

    #[test]
    fn require_saved() {
        let account = Record::<Account>::new();
        assert!(matches!(
            account.require_saved(),
            Err(Error::ObjectSaveRequired(_))
        ));
    }

    struct Imported;

    impl Model for Imported {
        const NAME: &'static str = "Imported";

        fn schema() -> &'static Schema {
            static SCHEMA: OnceLock<Schema> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::builder()
                    .field(FieldDef::required(ID_FIELD).rejected())
                    .field(FieldDef::required("source"))
                    .build()
            })
        }
    }

    #[test]
    fn required_identity_is_checked_against_the_identity() {
        let mut record = Record::<Imported>::new();
        record.set("source", "legacy").unwrap();
        assert_eq!(record.missing_fields(), vec!["_id"]);

        record.set("_id", ObjectId::new().to_string()).unwrap();
        assert!(record.missing_fields().is_empty());
        assert!(record.is_complete());
    }
}
