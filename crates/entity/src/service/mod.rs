//! The entity service: CRUD and versioning orchestration over a
//! [`DataStore`] backend.
//!
//! Key invariants maintained here rather than in storage:
//!
//! - Soft-deleted entities are invisible to every read path, regardless of
//!   caller-supplied filters.
//! - Every entity has exactly one draft version row; head-record metadata
//!   updates are mirrored onto it in the same operation.
//! - Committed snapshots get their number from the store's atomic
//!   allocator and re-create the draft's fields under the new version row,
//!   keeping each field's `permanent_id` stable across snapshots.

use tracing::{debug, info};

use appforge_storage::{
    CommitRecord, DataStore, DataType, EntityFieldRecord, EntityFilter, EntityListArgs,
    EntityPatch, EntityRecord, EntityVersionRecord, FieldListArgs, FieldPatch, NewEntity,
    NewEntityField, NewEntityVersion, Patch, VersionFilter, VersionListArgs, VersionNumber,
    VersionScope, now_rfc3339,
};

use crate::error::EntityError;
use crate::name::validate_name;
use crate::properties::PropertiesValidator;
use crate::soft_delete::prepare_deleted_item_name;

use std::collections::BTreeSet;

// ── Inputs ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreateEntityInput {
    pub app_id: String,
    pub name: String,
    pub display_name: String,
    pub plural_display_name: String,
    pub description: Option<String>,
}

/// Metadata update for an entity head. Applied fields are mirrored onto the
/// draft version.
#[derive(Debug, Clone, Default)]
pub struct UpdateEntityInput {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub plural_display_name: Option<String>,
    pub description: Patch<String>,
}

#[derive(Debug, Clone)]
pub struct CreateVersionInput {
    pub entity_id: String,
    pub commit_id: String,
}

#[derive(Debug, Clone)]
pub struct CreateFieldInput {
    pub entity_id: String,
    pub name: String,
    pub display_name: String,
    pub data_type: DataType,
    pub properties: serde_json::Value,
    pub required: bool,
    pub searchable: bool,
    pub description: Option<String>,
}

// ── Service ──────────────────────────────────────────────────────────────────

pub struct EntityService<S> {
    store: S,
    properties: PropertiesValidator,
}

impl<S: DataStore> EntityService<S> {
    pub fn new(store: S) -> Result<Self, EntityError> {
        Ok(Self {
            store,
            properties: PropertiesValidator::new()?,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The entity's draft version row. Its absence is a data corruption,
    /// not a normal miss.
    async fn draft_version(&self, entity_id: &str) -> Result<EntityVersionRecord, EntityError> {
        self.store
            .find_version(VersionFilter::draft_of(entity_id))
            .await?
            .ok_or_else(|| EntityError::DraftNotFound {
                entity_id: entity_id.to_string(),
            })
    }

    // ── Lookup and listing ───────────────────────────────────────────────────

    /// Fetch at most one live entity matching the filter.
    ///
    /// Soft-deleted rows never match, whatever the caller put in the filter.
    pub async fn entity(&self, mut filter: EntityFilter) -> Result<EntityRecord, EntityError> {
        filter.include_deleted = false;
        let wanted = filter
            .id
            .clone()
            .or_else(|| filter.name.clone())
            .unwrap_or_default();
        self.store
            .find_entity(filter)
            .await?
            .ok_or(EntityError::EntityNotFound { entity_id: wanted })
    }

    /// List live entities matching the caller's filter/sort/pagination.
    pub async fn entities(
        &self,
        mut args: EntityListArgs,
    ) -> Result<Vec<EntityRecord>, EntityError> {
        args.filter.include_deleted = false;
        Ok(self.store.list_entities(args).await?)
    }

    // ── Creation ─────────────────────────────────────────────────────────────

    /// Create an entity pre-locked by its creator, together with its draft
    /// version mirroring the display metadata. Fields are added afterwards
    /// through [`create_field`](Self::create_field).
    pub async fn create_entity(
        &self,
        input: CreateEntityInput,
        user_id: &str,
    ) -> Result<EntityRecord, EntityError> {
        validate_name(&input.name)?;
        let entity = self
            .store
            .create_entity(NewEntity {
                app_id: input.app_id,
                name: input.name.clone(),
                display_name: input.display_name.clone(),
                plural_display_name: input.plural_display_name.clone(),
                description: input.description.clone(),
                locked_by_user_id: Some(user_id.to_string()),
                locked_at: Some(now_rfc3339()),
            })
            .await?;
        self.store
            .create_version(NewEntityVersion {
                entity_id: entity.id.clone(),
                number: VersionNumber::Draft,
                commit_id: None,
                name: input.name,
                display_name: input.display_name,
                plural_display_name: input.plural_display_name,
                description: input.description,
            })
            .await?;
        info!(entity_id = %entity.id, name = %entity.name, "created entity");
        Ok(entity)
    }

    // ── Soft deletion ────────────────────────────────────────────────────────

    /// Soft-delete an entity: rewrite its name columns with the
    /// deleted-item transform (freeing the originals for reuse), stamp
    /// `deleted_at`, and mark the draft version deleted. The rows are
    /// retained for history and audit.
    pub async fn delete_entity(&self, entity_id: &str) -> Result<EntityRecord, EntityError> {
        let entity = self.entity(EntityFilter::by_id(entity_id)).await?;
        let draft = self.draft_version(entity_id).await?;
        let updated = self
            .store
            .update_entity(
                entity_id,
                EntityPatch {
                    name: Some(prepare_deleted_item_name(&entity.name, &entity.id)),
                    display_name: Some(prepare_deleted_item_name(
                        &entity.display_name,
                        &entity.id,
                    )),
                    plural_display_name: Some(prepare_deleted_item_name(
                        &entity.plural_display_name,
                        &entity.id,
                    )),
                    deleted_at: Patch::Set(now_rfc3339()),
                    ..EntityPatch::default()
                },
            )
            .await?;
        self.store
            .update_version(
                &draft.id,
                appforge_storage::VersionPatch {
                    deleted: Some(true),
                    ..appforge_storage::VersionPatch::default()
                },
            )
            .await?;
        info!(entity_id, "soft-deleted entity");
        Ok(updated)
    }

    // ── Update ───────────────────────────────────────────────────────────────

    /// Update head metadata and mirror
    /// name/display_name/plural_display_name/description onto the draft
    /// version in the same operation.
    pub async fn update_entity(
        &self,
        entity_id: &str,
        update: UpdateEntityInput,
    ) -> Result<EntityRecord, EntityError> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        let draft = self.draft_version(entity_id).await?;
        let updated = self
            .store
            .update_entity(
                entity_id,
                EntityPatch {
                    name: update.name.clone(),
                    display_name: update.display_name.clone(),
                    plural_display_name: update.plural_display_name.clone(),
                    description: update.description.clone(),
                    ..EntityPatch::default()
                },
            )
            .await?;
        self.store
            .update_version(
                &draft.id,
                appforge_storage::VersionPatch {
                    name: update.name,
                    display_name: update.display_name,
                    plural_display_name: update.plural_display_name,
                    description: update.description,
                    ..appforge_storage::VersionPatch::default()
                },
            )
            .await?;
        debug!(entity_id, "updated entity metadata");
        Ok(updated)
    }

    // ── Fields ───────────────────────────────────────────────────────────────

    /// List the fields of one version of an entity, merging the caller's
    /// filter with the version scope.
    pub async fn get_entity_fields(
        &self,
        entity_id: &str,
        number: VersionNumber,
        mut args: FieldListArgs,
    ) -> Result<Vec<EntityFieldRecord>, EntityError> {
        args.filter.entity_scope = Some(VersionScope {
            entity_id: entity_id.to_string(),
            number,
        });
        Ok(self.store.list_fields(args).await?)
    }

    /// Create a field on the entity's draft version.
    ///
    /// The field name must be identifier-safe and the properties payload
    /// must satisfy the JSON schema for the declared data type.
    pub async fn create_field(
        &self,
        input: CreateFieldInput,
    ) -> Result<EntityFieldRecord, EntityError> {
        validate_name(&input.name)?;
        self.properties
            .validate(&input.name, input.data_type, &input.properties)?;
        let draft = self.draft_version(&input.entity_id).await?;
        let field = self
            .store
            .create_field(NewEntityField {
                entity_version_id: draft.id,
                permanent_id: None,
                name: input.name,
                display_name: input.display_name,
                data_type: input.data_type,
                properties: input.properties,
                required: input.required,
                searchable: input.searchable,
                description: input.description,
            })
            .await?;
        debug!(entity_id = %input.entity_id, field_id = %field.id, "created field");
        Ok(field)
    }

    /// Pass-through field update. Validation beyond what the caller
    /// supplies is the caller's responsibility.
    pub async fn update_field(
        &self,
        field_id: &str,
        patch: FieldPatch,
    ) -> Result<EntityFieldRecord, EntityError> {
        Ok(self.store.update_field(field_id, patch).await?)
    }

    // ── Versioning ───────────────────────────────────────────────────────────

    /// Create a commit-time snapshot of the entity's draft.
    ///
    /// The new version gets the next committed number from the store's
    /// atomic allocator, copies the draft's metadata, links the commit, and
    /// re-creates the draft's fields under itself (fresh row ids, stable
    /// permanent ids).
    pub async fn create_version(
        &self,
        input: CreateVersionInput,
    ) -> Result<EntityVersionRecord, EntityError> {
        let draft = self.draft_version(&input.entity_id).await?;
        let fields = self
            .store
            .list_fields(FieldListArgs {
                filter: appforge_storage::FieldFilter {
                    entity_version_id: Some(draft.id.clone()),
                    ..appforge_storage::FieldFilter::default()
                },
                take: None,
            })
            .await?;
        let number = self.store.allocate_version_number(&input.entity_id).await?;
        let version = self
            .store
            .create_version(NewEntityVersion {
                entity_id: input.entity_id.clone(),
                number,
                commit_id: Some(input.commit_id),
                name: draft.name,
                display_name: draft.display_name,
                plural_display_name: draft.plural_display_name,
                description: draft.description,
            })
            .await?;
        for field in fields {
            self.store
                .create_field(NewEntityField {
                    entity_version_id: version.id.clone(),
                    permanent_id: Some(field.permanent_id),
                    name: field.name,
                    display_name: field.display_name,
                    data_type: field.data_type,
                    properties: field.properties,
                    required: field.required,
                    searchable: field.searchable,
                    description: field.description,
                })
                .await?;
        }
        info!(entity_id = %input.entity_id, number = %version.number, "created version snapshot");
        Ok(version)
    }

    /// Pass-through version listing.
    pub async fn get_versions(
        &self,
        args: VersionListArgs,
    ) -> Result<Vec<EntityVersionRecord>, EntityError> {
        Ok(self.store.list_versions(args).await?)
    }

    /// The commit a version belongs to.
    pub async fn get_version_commit(
        &self,
        version_id: &str,
    ) -> Result<CommitRecord, EntityError> {
        let version = self
            .store
            .find_version(VersionFilter {
                id: Some(version_id.to_string()),
                ..VersionFilter::default()
            })
            .await?
            .ok_or_else(|| EntityError::VersionNotFound {
                version_id: version_id.to_string(),
            })?;
        let commit_id = version
            .commit_id
            .ok_or_else(|| EntityError::CommitNotFound {
                version_id: version_id.to_string(),
            })?;
        self.store
            .find_commit(&commit_id)
            .await?
            .ok_or(EntityError::CommitNotFound {
                version_id: version_id.to_string(),
            })
    }

    // ── Cross-entity validation ──────────────────────────────────────────────

    /// True iff a live entity with the given id exists under the given app.
    pub async fn is_entity_in_same_app(
        &self,
        entity_id: &str,
        app_id: &str,
    ) -> Result<bool, EntityError> {
        let found = self
            .store
            .find_entity(EntityFilter {
                id: Some(entity_id.to_string()),
                app_id: Some(app_id.to_string()),
                ..EntityFilter::default()
            })
            .await?;
        Ok(found.is_some())
    }

    /// The subset of `field_names` that do NOT exist among the entity's
    /// draft fields. Duplicate names collapse in both input and output.
    pub async fn validate_all_fields_exist(
        &self,
        entity_id: &str,
        field_names: &[String],
    ) -> Result<BTreeSet<String>, EntityError> {
        let requested: BTreeSet<String> = field_names.iter().cloned().collect();
        let existing = self
            .store
            .list_fields(FieldListArgs {
                filter: appforge_storage::FieldFilter {
                    entity_scope: Some(VersionScope {
                        entity_id: entity_id.to_string(),
                        number: VersionNumber::Draft,
                    }),
                    name_in: Some(requested.clone()),
                    ..appforge_storage::FieldFilter::default()
                },
                take: None,
            })
            .await?;
        let existing_names: BTreeSet<String> =
            existing.into_iter().map(|field| field.name).collect();
        Ok(requested.difference(&existing_names).cloned().collect())
    }

    // ── Locking ──────────────────────────────────────────────────────────────

    /// Acquire the edit lock on a live entity.
    ///
    /// Re-acquiring one's own lock is a no-op. A lock held by another user
    /// is a conflict.
    pub async fn acquire_lock(
        &self,
        entity_id: &str,
        user_id: &str,
    ) -> Result<EntityRecord, EntityError> {
        let entity = self.entity(EntityFilter::by_id(entity_id)).await?;
        match entity.locked_by_user_id.as_deref() {
            Some(holder) if holder == user_id => Ok(entity),
            Some(holder) => Err(EntityError::LockConflict {
                entity_id: entity_id.to_string(),
                locked_by_user_id: holder.to_string(),
            }),
            None => {
                let updated = self
                    .store
                    .update_entity(
                        entity_id,
                        EntityPatch {
                            locked_by_user_id: Patch::Set(user_id.to_string()),
                            locked_at: Patch::Set(now_rfc3339()),
                            ..EntityPatch::default()
                        },
                    )
                    .await?;
                debug!(entity_id, user_id, "acquired entity lock");
                Ok(updated)
            }
        }
    }

    /// Unconditionally clear the lock holder and timestamp.
    pub async fn release_lock(&self, entity_id: &str) -> Result<EntityRecord, EntityError> {
        let updated = self
            .store
            .update_entity(
                entity_id,
                EntityPatch {
                    locked_by_user_id: Patch::Clear,
                    locked_at: Patch::Clear,
                    ..EntityPatch::default()
                },
            )
            .await?;
        debug!(entity_id, "released entity lock");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests;
