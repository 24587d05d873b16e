//! Field registry for record types.
//!
//! A [`Schema`] declares, in order, the fields a record type carries, which
//! of them are required, rejected by bulk updates or restricted from default
//! serialization, how each is defaulted, the key field used for
//! human-readable lookups, and the secondary indexes to maintain.

use crate::id::ID_FIELD;
use crate::index::IndexDecl;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// How a field is filled when construction does not supply it.
#[derive(Clone, Default)]
pub enum DefaultValue {
    /// JSON `null`
    #[default]
    Null,
    /// A value cloned into every new instance. Containers are deep-copied,
    /// so instances never share a default list or object.
    Value(Value),
    /// A producer invoked afresh for every new instance.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Wrap a producer function.
    pub fn factory(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        DefaultValue::Factory(Arc::new(f))
    }

    /// Produce the value for a new instance.
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Null => Value::Null,
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Null => write!(f, "Null"),
            DefaultValue::Value(v) => write!(f, "Value({v})"),
            DefaultValue::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// Definition of a field in a record type.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Must be non-null and non-empty before save
    pub required: bool,
    /// Ignored by bulk updates
    pub rejected: bool,
    /// Left out of default serialization
    pub restricted: bool,
    /// Default strategy
    pub default: DefaultValue,
}

impl FieldDef {
    /// Create a new required field definition.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            required: true,
            ..Self::optional(name)
        }
    }

    /// Create a new optional field definition.
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            rejected: false,
            restricted: false,
            default: DefaultValue::Null,
        }
    }

    /// Exclude the field from bulk updates.
    pub fn rejected(mut self) -> Self {
        self.rejected = true;
        self
    }

    /// Exclude the field from default serialization.
    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    /// Default to a static value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    /// Default to a freshly produced value.
    pub fn default_with(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = DefaultValue::factory(f);
        self
    }

    /// Whether `value` counts as missing for a required field.
    pub fn is_missing(value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }
}

/// Static descriptor of a record type.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldDef>,
    key_field: Option<String>,
    indexes: Vec<IndexDecl>,
}

impl Schema {
    /// Start declaring a schema. The identity field is always declared first.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            schema: Schema {
                fields: vec![FieldDef::optional(ID_FIELD).rejected()],
                key_field: None,
                indexes: Vec::new(),
            },
        }
    }

    /// All field definitions in declaration order, identity first.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Declared field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Get a field definition by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `name` is a declared field.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Required fields in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn is_rejected(&self, name: &str) -> bool {
        name == ID_FIELD || self.field(name).is_some_and(|f| f.rejected)
    }

    pub fn is_restricted(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.restricted)
    }

    /// Field used for human-readable lookups.
    pub fn key_field(&self) -> Option<&str> {
        self.key_field.as_deref()
    }

    /// Declared indexes.
    pub fn indexes(&self) -> &[IndexDecl] {
        &self.indexes
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Declare a field. Redeclaring a name replaces the earlier definition in
    /// place, so names stay unique and keep their first position.
    pub fn field(mut self, field: FieldDef) -> Self {
        match self.schema.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.schema.fields.push(field),
        }
        self
    }

    /// Set the key field.
    pub fn key_field(mut self, name: impl Into<String>) -> Self {
        self.schema.key_field = Some(name.into());
        self
    }

    /// Declare an index.
    pub fn index(mut self, index: impl Into<IndexDecl>) -> Self {
        self.schema.indexes.push(index.into());
        self
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}
