//! Index synchronization.
//!
//! Reconciles the indexes a record type declares with the ones the storage
//! engine has. Meant to run at startup, before request traffic.
//!
//! Running it again with unchanged declarations touches nothing: indexes
//! whose keys and options already match are skipped without a driver call.
//! An index with the same keys but other options is a conflict. Conflicts
//! are logged and left alone unless `overwrite` is set, in which case the
//! live index is dropped and recreated.

use crate::driver::{Driver, DriverError};
use crate::index::{IndexDecl, IndexSpec};
use crate::error::Result;

/// Flags for [`ensure_indexes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsureOptions {
    /// Log every step at debug level
    pub loud: bool,
    /// Drop and recreate conflicting indexes
    pub overwrite: bool,
}

impl EnsureOptions {
    pub fn loud(mut self, loud: bool) -> Self {
        self.loud = loud;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// What [`ensure_indexes`] did, by index name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub created: Vec<String>,
    pub unchanged: Vec<String>,
    pub recreated: Vec<String>,
    pub conflicts: Vec<String>,
}

impl IndexReport {
    /// Whether the storage engine's index set was modified.
    pub fn changed(&self) -> bool {
        !self.created.is_empty() || !self.recreated.is_empty()
    }
}

/// Bring `collection`'s indexes in line with `declared`.
///
/// All declarations are normalized before the storage engine is touched, so
/// a malformed one fails the call without side effects.
pub fn ensure_indexes(
    driver: &dyn Driver,
    collection: &str,
    declared: &[IndexDecl],
    options: EnsureOptions,
) -> Result<IndexReport> {
    let specs = declared
        .iter()
        .map(IndexDecl::normalize)
        .collect::<Result<Vec<_>>>()?;

    let live = driver.list_indexes(collection)?;
    let mut report = IndexReport::default();

    for spec in &specs {
        let name = spec.name();
        match live.iter().find(|existing| existing.keys == spec.keys) {
            Some(existing) if existing.options == spec.options => {
                if options.loud {
                    tracing::debug!(collection, index = %name, "index up to date");
                }
                report.unchanged.push(name);
            }
            Some(_) => resolve_conflict(driver, collection, spec, options, &mut report)?,
            None => {
                if options.loud {
                    tracing::debug!(collection, index = %spec, "creating index");
                }
                match driver.create_index(collection, spec) {
                    Ok(()) => report.created.push(name),
                    Err(DriverError::IndexOptionsConflict { .. }) => {
                        resolve_conflict(driver, collection, spec, options, &mut report)?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    Ok(report)
}

fn resolve_conflict(
    driver: &dyn Driver,
    collection: &str,
    spec: &IndexSpec,
    options: EnsureOptions,
    report: &mut IndexReport,
) -> Result<()> {
    let name = spec.name();

    if !options.overwrite {
        tracing::error!(
            collection,
            index = %name,
            "index conflicts with existing one, use overwrite to fix it"
        );
        report.conflicts.push(name);
        return Ok(());
    }

    if options.loud {
        tracing::debug!(collection, index = %name, "dropping conflicting index");
    }
    driver.drop_index(collection, &spec.keys)?;

    if options.loud {
        tracing::debug!(collection, index = %spec, "creating index");
    }
    driver.create_index(collection, spec)?;
    report.recreated.push(name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDriver;

    fn declared() -> Vec<IndexDecl> {
        vec![
            IndexDecl::new(["username"]).unique(true),
            "-created_at".into(),
            IndexDecl::new(["user_id", "#token"]),
        ]
    }

    #[test]
    fn creates_missing_indexes() {
        let driver = MemoryDriver::new();
        let report =
            ensure_indexes(&driver, "user", &declared(), EnsureOptions::default()).unwrap();

        assert_eq!(
            report.created,
            vec!["username_1", "created_at_-1", "user_id_1_token_hashed"]
        );
        assert!(report.changed());
        assert_eq!(driver.list_indexes("user").unwrap().len(), 3);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let driver = MemoryDriver::new();
        ensure_indexes(&driver, "user", &declared(), EnsureOptions::default()).unwrap();
        let report =
            ensure_indexes(&driver, "user", &declared(), EnsureOptions::default()).unwrap();

        assert!(!report.changed());
        assert_eq!(report.unchanged.len(), 3);
    }

    #[test]
    fn conflict_is_reported_without_overwrite() {
        let driver = MemoryDriver::new();
        ensure_indexes(&driver, "user", &declared(), EnsureOptions::default()).unwrap();

        let changed = vec![IndexDecl::new(["username"]).unique(false)];
        let report = ensure_indexes(&driver, "user", &changed, EnsureOptions::default()).unwrap();

        assert_eq!(report.conflicts, vec!["username_1"]);
        let live = driver.list_indexes("user").unwrap();
        let username = live.iter().find(|i| i.name() == "username_1").unwrap();
        assert!(username.is_unique());
    }

    #[test]
    fn conflict_is_recreated_with_overwrite() {
        let driver = MemoryDriver::new();
        ensure_indexes(&driver, "user", &declared(), EnsureOptions::default()).unwrap();

        let changed = vec![IndexDecl::new(["username"]).unique(false)];
        let report = ensure_indexes(
            &driver,
            "user",
            &changed,
            EnsureOptions::default().overwrite(true).loud(true),
        )
        .unwrap();

        assert_eq!(report.recreated, vec!["username_1"]);
        let live = driver.list_indexes("user").unwrap();
        let username = live.iter().find(|i| i.name() == "username_1").unwrap();
        assert!(!username.is_unique());
    }

    #[test]
    fn malformed_declaration_touches_nothing() {
        let driver = MemoryDriver::new();
        let bad = vec![IndexDecl::from("username"), IndexDecl::new(["-"])];
        let result = ensure_indexes(&driver, "user", &bad, EnsureOptions::default());

        assert!(result.is_err());
        assert!(driver.list_indexes("user").unwrap().is_empty());
    }
}
