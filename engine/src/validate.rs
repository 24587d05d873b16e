//! Validators for common list-shaped fields.

use crate::{error::Result, Error};
use serde_json::Value;
use std::collections::HashSet;

/// Tags must be a list of non-empty strings. `null` counts as no tags.
pub fn tags(value: &Value) -> Result<()> {
    let items = match value {
        Value::Null => return Ok(()),
        Value::Array(items) => items,
        other => return Err(Error::InvalidTags(format!("tags must be a list, got {other}"))),
    };

    for item in items {
        match item.as_str() {
            Some(tag) if !tag.is_empty() => {}
            _ => return Err(Error::InvalidTags(format!("invalid tag {item}"))),
        }
    }
    Ok(())
}

/// Custom fields must be a list of `{"key": string, "value": any}` objects
/// with unique keys. `null` counts as none.
pub fn custom_fields(value: &Value) -> Result<()> {
    let items = match value {
        Value::Null => return Ok(()),
        Value::Array(items) => items,
        other => {
            return Err(Error::InvalidCustomFields(format!(
                "custom fields must be a list, got {other}"
            )))
        }
    };

    let mut keys = HashSet::new();
    for item in items {
        let object = item.as_object().ok_or_else(|| {
            Error::InvalidCustomFields(format!("custom field must be an object, got {item}"))
        })?;
        let key = object
            .get("key")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::InvalidCustomFields(format!("custom field without key: {item}")))?;
        if !object.contains_key("value") {
            return Err(Error::InvalidCustomFields(format!(
                "custom field {key} has no value"
            )));
        }
        if !keys.insert(key) {
            return Err(Error::InvalidCustomFields(format!(
                "duplicate custom field {key}"
            )));
        }
    }
    Ok(())
}
