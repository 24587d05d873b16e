//! # Micro Engine
//!
//! A thin object-document mapping layer for micro application skeletons.
//!
//! This crate maps in-memory records to documents in a schemaless document
//! store. It declares record types, validates them, runs their lifecycle
//! hooks around persistence and keeps their secondary indexes in sync. The
//! actual storage, indexing and query execution are delegated to a
//! [`Driver`].
//!
//! ## Core Concepts
//!
//! ### Record types
//!
//! A record type implements [`Model`] and exposes a static [`Schema`]:
//! - Ordered field declarations ([`FieldDef`]) with required, rejected and
//!   restricted flags
//! - Default strategies per field ([`DefaultValue`])
//! - A key field for human-readable lookups
//! - Index declarations ([`IndexDecl`])
//!
//! Collection names are derived from the type name (`UserToken` is stored in
//! `user_token`).
//!
//! ### Records
//!
//! A [`Record`] is one instance: a storage-assigned [`ObjectId`] once saved,
//! plus the declared fields as JSON values. Lifecycle operations:
//! - [`Record::save`] validates required fields, then upserts
//! - [`Record::update`] applies a patch, skipping rejected fields
//! - [`Record::destroy`] deletes, a no-op for unsaved records
//! - [`Record::reload`] refreshes fields from storage
//!
//! ### Queries and indexes
//!
//! [`Database::collection`] returns a per-type [`Collection`] with `find`,
//! `find_one`, `get`, `destroy_all` and `ensure_indexes`.
//!
//! ## Quick Start
//!
//! ```rust
//! use micro_engine::{Database, FieldDef, MemoryDriver, Model, Record, Schema};
//! use serde_json::json;
//! use std::sync::OnceLock;
//!
//! struct User;
//!
//! impl Model for User {
//!     const NAME: &'static str = "User";
//!
//!     fn schema() -> &'static Schema {
//!         static SCHEMA: OnceLock<Schema> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Schema::builder()
//!                 .field(FieldDef::required("username"))
//!                 .field(FieldDef::optional("tags").default_value(json!([])))
//!                 .key_field("username")
//!                 .build()
//!         })
//!     }
//! }
//!
//! let db = Database::new(MemoryDriver::new());
//!
//! let mut user = Record::<User>::new();
//! user.set("username", "alice").unwrap();
//! user.save(&db).unwrap();
//! assert!(!user.is_new());
//!
//! let found = db.collection::<User>().get("alice").unwrap().unwrap();
//! assert_eq!(found, user);
//! ```

pub mod database;
pub mod driver;
pub mod error;
pub mod hierarchy;
pub mod id;
pub mod index;
pub mod indexer;
pub mod lifecycle;
pub mod memory;
pub mod naming;
pub mod record;
pub mod response;
pub mod schema;
pub mod validate;

// Re-export main types at crate root
pub use database::{id_query, Collection, Cursor, Database};
pub use driver::{
    Document, DocumentStream, Driver, DriverError, DriverResult, FindOptions, SortOrder,
};
pub use error::{Error, Result};
pub use hierarchy::Hierarchical;
pub use id::{ObjectId, ID_FIELD};
pub use index::{index_specs_from_value, IndexDecl, IndexDirection, IndexKey, IndexSpec};
pub use indexer::{ensure_indexes, EnsureOptions, IndexReport};
pub use lifecycle::Hooks;
pub use memory::MemoryDriver;
pub use record::{Model, Record};
pub use response::{ApiError, ApiErrorKind};
pub use schema::{DefaultValue, FieldDef, Schema, SchemaBuilder};
