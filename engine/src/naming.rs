//! Record type to collection name resolution.
//!
//! Collection names are derived from the declared type name by turning
//! CamelCase into snake_case. The result is computed once per type and
//! cached by [`TypeId`].

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

/// Convert a CamelCase type name into a snake_case collection name.
///
/// Every ASCII uppercase letter is lowercased and, unless it is the first
/// character, preceded by an underscore. Everything else is kept as is, so
/// `HTTPToken` becomes `h_t_t_p_token`.
pub fn snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i != 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

fn cache() -> &'static RwLock<HashMap<TypeId, &'static str>> {
    static CACHE: OnceLock<RwLock<HashMap<TypeId, &'static str>>> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Memoized collection name for the type `T` declared as `name`.
///
/// The first call for a type computes and stores the name; later calls for
/// the same type return the cached value, whatever `name` they pass.
pub fn collection_name<T: 'static>(name: &str) -> &'static str {
    let key = TypeId::of::<T>();

    let cached = cache()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&key)
        .copied();
    if let Some(cached) = cached {
        return cached;
    }

    let mut names = cache().write().unwrap_or_else(|e| e.into_inner());
    *names
        .entry(key)
        .or_insert_with(|| &*Box::leak(snake_case(name).into_boxed_str()))
}
