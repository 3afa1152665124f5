//! Entity CRUD/versioning core.
//!
//! `EntityService` manages entity head records, their versioned snapshots,
//! and nested field definitions over a generic [`DataStore`] backend. It
//! owns the domain rules (identifier-safe naming, soft-delete visibility,
//! draft/head synchronization, commit-time snapshotting, edit locking)
//! while delegating all persistence to the store.
//!
//! [`DataStore`]: appforge_storage::DataStore

mod error;
mod name;
mod properties;
mod service;
mod soft_delete;

pub use error::EntityError;
pub use name::{is_valid_identifier, NAME_VALIDATION_ERROR_MESSAGE};
pub use properties::PropertiesValidator;
pub use service::{
    CreateEntityInput, CreateFieldInput, CreateVersionInput, EntityService, UpdateEntityInput,
};
pub use soft_delete::prepare_deleted_item_name;
