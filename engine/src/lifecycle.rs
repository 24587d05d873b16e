//! Save, update, destroy and reload.
//!
//! Every operation runs synchronously against the [`Database`]'s driver and
//! holds no state beyond the call. Concurrent saves of the same identity are
//! last-write-wins at the storage engine.

use crate::database::{id_query, Database};
use crate::driver::Document;
use crate::id::ID_FIELD;
use crate::record::{Model, Record};
use crate::{error::Result, Error};

/// Whether lifecycle hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hooks {
    #[default]
    Run,
    Skip,
}

impl Hooks {
    fn enabled(self) -> bool {
        self == Hooks::Run
    }
}

impl<M: Model> Record<M> {
    /// Validate and persist, running hooks.
    pub fn save(&mut self, db: &Database) -> Result<()> {
        self.save_with(db, Hooks::Run)
    }

    /// Validate and persist.
    ///
    /// Fails with [`Error::FieldRequired`] for the first missing required
    /// field before anything is written. A new instance gets its identity
    /// from the driver.
    pub fn save_with(&mut self, db: &Database, hooks: Hooks) -> Result<()> {
        if let Some(field) = self.missing_fields().first() {
            return Err(Error::FieldRequired(field.to_string()));
        }

        if hooks.enabled() {
            M::before_save(self, db)?;
        }

        let id = db
            .driver()
            .upsert(M::collection(), self.id, self.to_document())?;
        if self.id.is_none() {
            tracing::debug!(collection = M::collection(), %id, "inserted record");
        }
        self.id = Some(id);

        if hooks.enabled() {
            M::after_save(self, db)?;
        }
        Ok(())
    }

    /// Apply a patch and save, running hooks.
    pub fn update(&mut self, db: &Database, patch: &Document) -> Result<()> {
        self.update_with(db, patch, Hooks::Run)
    }

    /// Apply a patch and save.
    ///
    /// Only declared, non-rejected fields other than the identity are taken
    /// from `patch`; everything else in it is ignored.
    pub fn update_with(&mut self, db: &Database, patch: &Document, hooks: Hooks) -> Result<()> {
        let schema = M::schema();
        for field in schema.fields() {
            if field.name == ID_FIELD || field.rejected {
                continue;
            }
            if let Some(value) = patch.get(&field.name) {
                self.values.insert(field.name.clone(), value.clone());
            }
        }
        self.save_with(db, hooks)
    }

    /// Delete the persisted document, running hooks.
    pub fn destroy(&mut self, db: &Database) -> Result<()> {
        self.destroy_with(db, Hooks::Run)
    }

    /// Delete the persisted document and forget the identity.
    ///
    /// A new instance is left alone: no hook runs, no storage call is made.
    pub fn destroy_with(&mut self, db: &Database, hooks: Hooks) -> Result<()> {
        let Some(id) = self.id else {
            return Ok(());
        };

        if hooks.enabled() {
            M::before_delete(self, db)?;
        }

        db.driver().delete_by_id(M::collection(), id)?;
        tracing::debug!(collection = M::collection(), %id, "deleted record");

        if hooks.enabled() {
            M::after_delete(self, db)?;
        }
        self.id = None;
        Ok(())
    }

    /// Overwrite every non-identity field with the persisted values.
    pub fn reload(&mut self, db: &Database) -> Result<()> {
        let id = self.require_saved()?;
        let fresh = db
            .collection::<M>()
            .find_one(id_query(id))?
            .ok_or_else(|| Error::NotFound {
                collection: M::collection().to_string(),
                id: id.to_string(),
            })?;
        self.values = fresh.values;
        Ok(())
    }
}
