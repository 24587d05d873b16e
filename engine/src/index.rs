//! Declarative index specifications.
//!
//! An index is declared with prefixed key strings:
//!
//! - `"-created_at"` descending
//! - `"#token"` hashed
//! - `"+username"` or `"username"` ascending
//!
//! A compound index lists several keys. Options (`unique`, `sparse`, or any
//! driver-specific option) travel alongside the keys; `sparse` defaults to
//! `false`.

use crate::{driver::Document, error::Result, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Order or type of an index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexDirection {
    Ascending,
    Descending,
    Hashed,
}

impl IndexDirection {
    /// Conventional suffix used in index names.
    fn suffix(self) -> &'static str {
        match self {
            IndexDirection::Ascending => "1",
            IndexDirection::Descending => "-1",
            IndexDirection::Hashed => "hashed",
        }
    }
}

/// One key of an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexKey {
    pub field: String,
    pub direction: IndexDirection,
}

impl IndexKey {
    /// Parse a prefixed key string.
    pub fn parse(key: &str) -> Result<Self> {
        let (field, direction) = if let Some(rest) = key.strip_prefix('-') {
            (rest, IndexDirection::Descending)
        } else if let Some(rest) = key.strip_prefix('#') {
            (rest, IndexDirection::Hashed)
        } else if let Some(rest) = key.strip_prefix('+') {
            (rest, IndexDirection::Ascending)
        } else {
            (key, IndexDirection::Ascending)
        };

        if field.is_empty() {
            return Err(Error::InvalidIndexes(format!("empty index key '{key}'")));
        }

        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Render keys the way index names are usually spelled: `user_id_1_created_at_-1`.
pub fn keys_name(keys: &[IndexKey]) -> String {
    keys.iter()
        .map(|k| format!("{}_{}", k.field, k.direction.suffix()))
        .collect::<Vec<_>>()
        .join("_")
}

/// A normalized index: ordered keys plus options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub keys: Vec<IndexKey>,
    pub options: Document,
}

impl IndexSpec {
    /// Single-key index from a prefixed key string.
    pub fn key(key: &str) -> Result<Self> {
        Self::compound([key])
    }

    /// Compound index from prefixed key strings.
    pub fn compound<'a>(keys: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let keys = keys
            .into_iter()
            .map(IndexKey::parse)
            .collect::<Result<Vec<_>>>()?;
        Self::from_keys(keys)
    }

    /// Index over already parsed keys, with default options.
    pub fn from_keys(keys: Vec<IndexKey>) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::InvalidIndexes("index declares no keys".into()));
        }
        let mut options = Document::new();
        options.insert("sparse".into(), Value::Bool(false));
        Ok(Self { keys, options })
    }

    /// Set an arbitrary option.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Builder-style `unique` option.
    pub fn unique(self, unique: bool) -> Self {
        self.option("unique", unique)
    }

    /// Builder-style `sparse` option.
    pub fn sparse(self, sparse: bool) -> Self {
        self.option("sparse", sparse)
    }

    /// Whether the `unique` option is set.
    pub fn is_unique(&self) -> bool {
        self.options.get("unique").and_then(Value::as_bool) == Some(true)
    }

    /// Whether the `sparse` option is set.
    pub fn is_sparse(&self) -> bool {
        self.options.get("sparse").and_then(Value::as_bool) == Some(true)
    }

    /// Conventional index name.
    pub fn name(&self) -> String {
        keys_name(&self.keys)
    }

    /// Parse one JSON index declaration: a key string, or an array mixing key
    /// strings and option objects.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(key) => Self::key(key),
            Value::Array(parts) => {
                let mut keys = Vec::new();
                let mut options = Document::new();
                for part in parts {
                    match part {
                        Value::String(key) => keys.push(IndexKey::parse(key)?),
                        Value::Object(opts) => {
                            options.extend(opts.iter().map(|(k, v)| (k.clone(), v.clone())))
                        }
                        other => {
                            return Err(Error::InvalidIndexes(format!(
                                "unexpected index component: {other}"
                            )))
                        }
                    }
                }
                let mut spec = Self::from_keys(keys)?;
                spec.options.extend(options);
                Ok(spec)
            }
            other => Err(Error::InvalidIndexes(format!(
                "index must be a string or a list, got {other}"
            ))),
        }
    }
}

impl fmt::Display for IndexSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if !self.options.is_empty() {
            write!(f, " {}", Value::Object(self.options.clone()))?;
        }
        Ok(())
    }
}

/// An index as declared on a schema, before normalization.
///
/// Declarations are cheap and infallible to build; key parsing happens when
/// indexes are synchronized, see [`IndexDecl::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDecl {
    pub keys: Vec<String>,
    pub options: Document,
}

impl IndexDecl {
    /// Declare an index over prefixed key strings.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            options: Document::new(),
        }
    }

    /// Set an arbitrary option.
    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    /// Builder-style `unique` option.
    pub fn unique(self, unique: bool) -> Self {
        self.option("unique", unique)
    }

    /// Builder-style `sparse` option.
    pub fn sparse(self, sparse: bool) -> Self {
        self.option("sparse", sparse)
    }

    /// Parse keys and merge options over the defaults.
    pub fn normalize(&self) -> Result<IndexSpec> {
        let mut spec = IndexSpec::compound(self.keys.iter().map(String::as_str))?;
        spec.options
            .extend(self.options.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(spec)
    }
}

impl From<&str> for IndexDecl {
    fn from(key: &str) -> Self {
        Self::new([key])
    }
}

/// Parse a JSON list of index declarations.
///
/// Fails with [`Error::InvalidIndexes`] when `value` is not a list.
pub fn index_specs_from_value(value: &Value) -> Result<Vec<IndexSpec>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::InvalidIndexes("indexes must be a list".into()))?;
    items.iter().map(IndexSpec::from_value).collect()
}
