use async_trait::async_trait;

use crate::args::{
    EntityFilter, EntityListArgs, EntityPatch, FieldListArgs, FieldPatch, VersionFilter,
    VersionListArgs, VersionPatch,
};
use crate::error::StorageError;
use crate::record::{
    CommitRecord, EntityFieldRecord, EntityRecord, EntityVersionRecord, NewCommit, NewEntity,
    NewEntityField, NewEntityVersion, VersionNumber,
};

/// The data-access trait for appforge persistence backends.
///
/// A `DataStore` implementation provides per-table find-one / find-many /
/// create / update operations over the four related tables: entity heads,
/// entity versions, entity fields, and commits. It is a generic query and
/// update surface; all domain rules (soft-delete visibility, draft/head
/// synchronization, name validation) live in the service layer on top.
///
/// ## Contract
///
/// - `find_*` returns `Ok(None)` when nothing matches; it never errors on
///   absence.
/// - `update_*` of a missing row returns `Err(StorageError::RecordNotFound)`.
/// - `create_version` enforces the unique `(entity_id, number)` pair and
///   returns `Err(StorageError::DuplicateRecord)` on violation.
/// - Create operations generate the record id and stamp
///   `created_at` / `updated_at`; updates refresh `updated_at`.
///
/// ## Version-number allocation
///
/// `allocate_version_number` hands out the next committed number for an
/// entity atomically with respect to the store's own synchronization
/// (mutex, transaction, or unique-constraint retry). Callers never compute
/// max + 1 from a read themselves.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be shared across
/// async task boundaries.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    // ── Entities ─────────────────────────────────────────────────────────────

    /// Find at most one entity head matching the filter.
    async fn find_entity(&self, filter: EntityFilter) -> Result<Option<EntityRecord>, StorageError>;

    /// List entity heads matching the filter, with optional sort and
    /// pagination.
    async fn list_entities(&self, args: EntityListArgs) -> Result<Vec<EntityRecord>, StorageError>;

    /// Insert a new entity head.
    async fn create_entity(&self, new: NewEntity) -> Result<EntityRecord, StorageError>;

    /// Patch an entity head by id, returning the updated record.
    async fn update_entity(
        &self,
        entity_id: &str,
        patch: EntityPatch,
    ) -> Result<EntityRecord, StorageError>;

    // ── Versions ─────────────────────────────────────────────────────────────

    /// Find at most one version row matching the filter.
    async fn find_version(
        &self,
        filter: VersionFilter,
    ) -> Result<Option<EntityVersionRecord>, StorageError>;

    /// List version rows matching the filter, with optional sort and limit.
    async fn list_versions(
        &self,
        args: VersionListArgs,
    ) -> Result<Vec<EntityVersionRecord>, StorageError>;

    /// Insert a new version row.
    ///
    /// Fails with `DuplicateRecord` if the entity already has a row with
    /// the same number.
    async fn create_version(
        &self,
        new: NewEntityVersion,
    ) -> Result<EntityVersionRecord, StorageError>;

    /// Patch a version row by id, returning the updated record.
    async fn update_version(
        &self,
        version_id: &str,
        patch: VersionPatch,
    ) -> Result<EntityVersionRecord, StorageError>;

    /// Atomically allocate the next committed version number for an entity:
    /// one greater than the highest number currently stored, or 1 when only
    /// the draft exists. Two sequential allocations never return the same
    /// number.
    async fn allocate_version_number(
        &self,
        entity_id: &str,
    ) -> Result<VersionNumber, StorageError>;

    // ── Fields ───────────────────────────────────────────────────────────────

    /// Find a field by id.
    async fn find_field(&self, field_id: &str)
        -> Result<Option<EntityFieldRecord>, StorageError>;

    /// List fields matching the filter.
    ///
    /// A filter carrying an `entity_scope` is resolved through the version
    /// table: it matches the fields of the version row with that
    /// `(entity_id, number)` pair, or nothing if no such row exists.
    async fn list_fields(
        &self,
        args: FieldListArgs,
    ) -> Result<Vec<EntityFieldRecord>, StorageError>;

    /// Insert a new field under its version row.
    async fn create_field(
        &self,
        new: NewEntityField,
    ) -> Result<EntityFieldRecord, StorageError>;

    /// Patch a field by id, returning the updated record.
    async fn update_field(
        &self,
        field_id: &str,
        patch: FieldPatch,
    ) -> Result<EntityFieldRecord, StorageError>;

    // ── Commits ──────────────────────────────────────────────────────────────

    /// Insert a new commit checkpoint.
    async fn create_commit(&self, new: NewCommit) -> Result<CommitRecord, StorageError>;

    /// Find a commit by id.
    async fn find_commit(&self, commit_id: &str) -> Result<Option<CommitRecord>, StorageError>;
}
