use appforge_storage::StorageError;

use crate::name::NAME_VALIDATION_ERROR_MESSAGE;

/// All errors that can be returned by the entity service.
///
/// Data-layer not-found and constraint errors propagate unchanged through
/// the `Storage` variant; the service adds its own variants only where it
/// enforces a domain rule itself.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// The name does not match the identifier-safe pattern. The message is
    /// fixed; callers match on it.
    #[error("{}", NAME_VALIDATION_ERROR_MESSAGE)]
    InvalidName { name: String },

    /// No live entity matched the lookup.
    #[error("entity not found: {entity_id}")]
    EntityNotFound { entity_id: String },

    /// The entity has no draft version row. Every entity is created with
    /// one, so this indicates a corrupted record set.
    #[error("draft version not found for entity: {entity_id}")]
    DraftNotFound { entity_id: String },

    /// No version row with the given id.
    #[error("entity version not found: {version_id}")]
    VersionNotFound { version_id: String },

    /// The version exists but has no commit, or its commit row is missing.
    #[error("no commit for entity version: {version_id}")]
    CommitNotFound { version_id: String },

    /// The entity is locked by another user.
    #[error("entity {entity_id} is locked by user {locked_by_user_id}")]
    LockConflict {
        entity_id: String,
        locked_by_user_id: String,
    },

    /// The field's properties payload does not satisfy the JSON schema for
    /// its data type.
    #[error("invalid properties for field {field}: {message}")]
    InvalidProperties { field: String, message: String },

    /// A built-in properties schema failed to compile.
    #[error("properties schema error: {0}")]
    Schema(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
