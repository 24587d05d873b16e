//! Parent/child links between records of the same type.
//!
//! A hierarchical record type stores its parent's identity in one field and
//! its children's identities in a list field. Both sides are kept in sync and
//! persisted by every operation here.

use crate::database::Database;
use crate::id::ObjectId;
use crate::record::{Model, Record};
use crate::{error::Result, Error};
use serde_json::Value;
use std::collections::HashSet;

/// A record type that forms a tree.
///
/// The schema must declare both [`Hierarchical::PARENT_FIELD`] and
/// [`Hierarchical::CHILDREN_FIELD`]; the latter should default to `[]`.
pub trait Hierarchical: Model {
    const PARENT_FIELD: &'static str = "parent_id";
    const CHILDREN_FIELD: &'static str = "child_ids";
}

impl<M: Hierarchical> Record<M> {
    /// Identity of the parent, if linked.
    pub fn parent_id(&self) -> Option<ObjectId> {
        self.get(M::PARENT_FIELD).and_then(ObjectId::from_value)
    }

    /// Identities of the children.
    pub fn child_ids(&self) -> Vec<ObjectId> {
        self.get(M::CHILDREN_FIELD)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(ObjectId::from_value).collect())
            .unwrap_or_default()
    }

    fn set_child_ids(&mut self, ids: &[ObjectId]) -> Result<()> {
        let ids: Vec<Value> = ids.iter().map(ObjectId::to_value).collect();
        self.set(M::CHILDREN_FIELD, ids)
    }

    /// Make `parent` this record's parent.
    ///
    /// Both records must be saved. Fails with [`Error::ParentAlreadyExists`]
    /// when this record already has a parent, and with
    /// [`Error::ParentCycle`] when `parent` is this record or one of its
    /// descendants.
    pub fn set_parent(&mut self, db: &Database, parent: &mut Record<M>) -> Result<()> {
        let id = self.require_saved()?;
        let parent_id = parent.require_saved()?;

        if self.parent_id().is_some() {
            return Err(Error::ParentAlreadyExists);
        }
        if id == parent_id {
            return Err(Error::ParentCycle);
        }

        let records = db.collection::<M>();
        let mut seen = HashSet::new();
        let mut ancestor = parent.parent_id();
        while let Some(current) = ancestor {
            if current == id {
                return Err(Error::ParentCycle);
            }
            if !seen.insert(current) {
                break;
            }
            ancestor = records.get_by_id(current)?.and_then(|r| r.parent_id());
        }

        self.set(M::PARENT_FIELD, parent_id.to_value())?;
        let mut children = parent.child_ids();
        if !children.contains(&id) {
            children.push(id);
        }
        parent.set_child_ids(&children)?;

        self.save(db)?;
        parent.save(db)
    }

    /// Unlink this record from `parent`.
    ///
    /// Fails with [`Error::ParentDoesNotExist`] when `parent` is not this
    /// record's parent.
    pub fn remove_parent(&mut self, db: &Database, parent: &mut Record<M>) -> Result<()> {
        let id = self.require_saved()?;
        let parent_id = parent.require_saved()?;
        if self.parent_id() != Some(parent_id) {
            return Err(Error::ParentDoesNotExist);
        }

        self.set(M::PARENT_FIELD, Value::Null)?;
        let children: Vec<ObjectId> = parent
            .child_ids()
            .into_iter()
            .filter(|child| *child != id)
            .collect();
        parent.set_child_ids(&children)?;

        self.save(db)?;
        parent.save(db)
    }

    /// Adopt `child`. Fails with [`Error::ChildAlreadyExists`] when it is
    /// already one of this record's children.
    pub fn add_child(&mut self, db: &Database, child: &mut Record<M>) -> Result<()> {
        let child_id = child.require_saved()?;
        if self.child_ids().contains(&child_id) {
            return Err(Error::ChildAlreadyExists);
        }
        child.set_parent(db, self)
    }

    /// Release `child`. Fails with [`Error::ChildDoesNotExist`] when it is
    /// not one of this record's children.
    pub fn remove_child(&mut self, db: &Database, child: &mut Record<M>) -> Result<()> {
        let child_id = child.require_saved()?;
        if !self.child_ids().contains(&child_id) {
            return Err(Error::ChildDoesNotExist);
        }
        child.remove_parent(db, self)
    }
}
