//! Storage layer for the entity model.
//!
//! Defines the record types, query/update argument types, and the
//! [`DataStore`] trait every backend implements, plus the in-memory
//! reference backend and a backend-agnostic conformance suite.

mod args;
mod error;
mod memory;
mod record;
mod traits;

pub mod conformance;

pub use args::{
    EntityFilter, EntityListArgs, EntityOrderBy, EntityPatch, FieldFilter, FieldListArgs,
    FieldPatch, Patch, SortOrder, VersionFilter, VersionListArgs, VersionOrderBy, VersionPatch,
    VersionScope,
};
pub use error::StorageError;
pub use memory::MemoryStore;
pub use record::{
    now_rfc3339, CommitRecord, DataType, EntityFieldRecord, EntityRecord, EntityVersionRecord,
    NewCommit, NewEntity, NewEntityField, NewEntityVersion, VersionNumber,
};
pub use traits::DataStore;
