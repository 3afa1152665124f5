//! In-memory reference backend.
//!
//! `MemoryStore` keeps every table in a `Vec` behind one mutex, which makes
//! all operations (version-number allocation included) atomic with respect
//! to each other. It backs the service-layer tests and the conformance
//! suite; it is not a persistence engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::args::{
    EntityFilter, EntityListArgs, EntityOrderBy, EntityPatch, FieldFilter, FieldListArgs,
    FieldPatch, SortOrder, VersionFilter, VersionListArgs, VersionOrderBy, VersionPatch,
};
use crate::error::StorageError;
use crate::record::{
    now_rfc3339, CommitRecord, EntityFieldRecord, EntityRecord, EntityVersionRecord, NewCommit,
    NewEntity, NewEntityField, NewEntityVersion, VersionNumber,
};
use crate::traits::DataStore;

#[derive(Default)]
struct Inner {
    entities: Vec<EntityRecord>,
    versions: Vec<EntityVersionRecord>,
    fields: Vec<EntityFieldRecord>,
    commits: Vec<CommitRecord>,
    /// High-water mark of handed-out committed numbers per entity. Keeps
    /// allocation monotonic even before the allocated row is inserted.
    allocated: HashMap<String, u32>,
}

/// In-memory [`DataStore`] implementation.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means another test panicked mid-mutation;
        // the data itself is still usable.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn entity_matches(filter: &EntityFilter, rec: &EntityRecord) -> bool {
    if !filter.include_deleted && rec.deleted_at.is_some() {
        return false;
    }
    if let Some(id) = &filter.id {
        if &rec.id != id {
            return false;
        }
    }
    if let Some(app_id) = &filter.app_id {
        if &rec.app_id != app_id {
            return false;
        }
    }
    if let Some(name) = &filter.name {
        if &rec.name != name {
            return false;
        }
    }
    true
}

fn version_matches(filter: &VersionFilter, rec: &EntityVersionRecord) -> bool {
    if let Some(id) = &filter.id {
        if &rec.id != id {
            return false;
        }
    }
    if let Some(entity_id) = &filter.entity_id {
        if &rec.entity_id != entity_id {
            return false;
        }
    }
    if let Some(number) = filter.number {
        if rec.number != number {
            return false;
        }
    }
    if let Some(commit_id) = &filter.commit_id {
        if rec.commit_id.as_deref() != Some(commit_id.as_str()) {
            return false;
        }
    }
    true
}

impl Inner {
    /// Resolve a field filter's entity scope to a concrete version id.
    /// `None` means the scoped version does not exist and the whole query
    /// matches nothing; `Some(None)` means the filter is unscoped.
    fn resolve_field_scope(&self, filter: &FieldFilter) -> Option<Option<String>> {
        match &filter.entity_scope {
            None => Some(None),
            Some(scope) => {
                let version = self
                    .versions
                    .iter()
                    .find(|v| v.entity_id == scope.entity_id && v.number == scope.number)?;
                Some(Some(version.id.clone()))
            }
        }
    }
}

fn field_matches(
    filter: &FieldFilter,
    scoped_version_id: Option<&str>,
    rec: &EntityFieldRecord,
) -> bool {
    if let Some(version_id) = &filter.entity_version_id {
        if &rec.entity_version_id != version_id {
            return false;
        }
    }
    if let Some(version_id) = scoped_version_id {
        if rec.entity_version_id != version_id {
            return false;
        }
    }
    if let Some(names) = &filter.name_in {
        if !names.contains(&rec.name) {
            return false;
        }
    }
    true
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn find_entity(
        &self,
        filter: EntityFilter,
    ) -> Result<Option<EntityRecord>, StorageError> {
        let inner = self.lock();
        Ok(inner
            .entities
            .iter()
            .find(|e| entity_matches(&filter, e))
            .cloned())
    }

    async fn list_entities(&self, args: EntityListArgs) -> Result<Vec<EntityRecord>, StorageError> {
        let inner = self.lock();
        let mut matched: Vec<EntityRecord> = inner
            .entities
            .iter()
            .filter(|e| entity_matches(&args.filter, e))
            .cloned()
            .collect();
        if let Some(order_by) = args.order_by {
            match order_by {
                EntityOrderBy::Name(order) => {
                    matched.sort_by(|a, b| a.name.cmp(&b.name));
                    if order == SortOrder::Desc {
                        matched.reverse();
                    }
                }
                EntityOrderBy::CreatedAt(order) => {
                    matched.sort_by(|a, b| a.created_at.cmp(&b.created_at));
                    if order == SortOrder::Desc {
                        matched.reverse();
                    }
                }
            }
        }
        let skip = args.skip.unwrap_or(0);
        let take = args.take.unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(skip).take(take).collect())
    }

    async fn create_entity(&self, new: NewEntity) -> Result<EntityRecord, StorageError> {
        let mut inner = self.lock();
        let now = now_rfc3339();
        let record = EntityRecord {
            id: new_id(),
            created_at: now.clone(),
            updated_at: now,
            app_id: new.app_id,
            name: new.name,
            display_name: new.display_name,
            plural_display_name: new.plural_display_name,
            description: new.description,
            locked_by_user_id: new.locked_by_user_id,
            locked_at: new.locked_at,
            deleted_at: None,
        };
        inner.entities.push(record.clone());
        Ok(record)
    }

    async fn update_entity(
        &self,
        entity_id: &str,
        patch: EntityPatch,
    ) -> Result<EntityRecord, StorageError> {
        let mut inner = self.lock();
        let record = inner
            .entities
            .iter_mut()
            .find(|e| e.id == entity_id)
            .ok_or_else(|| StorageError::not_found("entity", entity_id))?;
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(display_name) = patch.display_name {
            record.display_name = display_name;
        }
        if let Some(plural) = patch.plural_display_name {
            record.plural_display_name = plural;
        }
        patch.description.apply(&mut record.description);
        patch.locked_by_user_id.apply(&mut record.locked_by_user_id);
        patch.locked_at.apply(&mut record.locked_at);
        patch.deleted_at.apply(&mut record.deleted_at);
        record.updated_at = now_rfc3339();
        Ok(record.clone())
    }

    async fn find_version(
        &self,
        filter: VersionFilter,
    ) -> Result<Option<EntityVersionRecord>, StorageError> {
        let inner = self.lock();
        Ok(inner
            .versions
            .iter()
            .find(|v| version_matches(&filter, v))
            .cloned())
    }

    async fn list_versions(
        &self,
        args: VersionListArgs,
    ) -> Result<Vec<EntityVersionRecord>, StorageError> {
        let inner = self.lock();
        let mut matched: Vec<EntityVersionRecord> = inner
            .versions
            .iter()
            .filter(|v| version_matches(&args.filter, v))
            .cloned()
            .collect();
        if let Some(VersionOrderBy::Number(order)) = args.order_by {
            matched.sort_by_key(|v| v.number);
            if order == SortOrder::Desc {
                matched.reverse();
            }
        }
        let take = args.take.unwrap_or(usize::MAX);
        Ok(matched.into_iter().take(take).collect())
    }

    async fn create_version(
        &self,
        new: NewEntityVersion,
    ) -> Result<EntityVersionRecord, StorageError> {
        let mut inner = self.lock();
        if inner
            .versions
            .iter()
            .any(|v| v.entity_id == new.entity_id && v.number == new.number)
        {
            return Err(StorageError::duplicate(
                "entity_version",
                format!("({}, {})", new.entity_id, new.number),
            ));
        }
        let now = now_rfc3339();
        let record = EntityVersionRecord {
            id: new_id(),
            created_at: now.clone(),
            updated_at: now,
            entity_id: new.entity_id,
            number: new.number,
            commit_id: new.commit_id,
            name: new.name,
            display_name: new.display_name,
            plural_display_name: new.plural_display_name,
            description: new.description,
            deleted: false,
        };
        inner.versions.push(record.clone());
        Ok(record)
    }

    async fn update_version(
        &self,
        version_id: &str,
        patch: VersionPatch,
    ) -> Result<EntityVersionRecord, StorageError> {
        let mut inner = self.lock();
        let record = inner
            .versions
            .iter_mut()
            .find(|v| v.id == version_id)
            .ok_or_else(|| StorageError::not_found("entity_version", version_id))?;
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(display_name) = patch.display_name {
            record.display_name = display_name;
        }
        if let Some(plural) = patch.plural_display_name {
            record.plural_display_name = plural;
        }
        patch.description.apply(&mut record.description);
        if let Some(deleted) = patch.deleted {
            record.deleted = deleted;
        }
        patch.commit_id.apply(&mut record.commit_id);
        record.updated_at = now_rfc3339();
        Ok(record.clone())
    }

    async fn allocate_version_number(
        &self,
        entity_id: &str,
    ) -> Result<VersionNumber, StorageError> {
        let mut inner = self.lock();
        let stored_max = inner
            .versions
            .iter()
            .filter(|v| v.entity_id == entity_id)
            .map(|v| v.number.as_number())
            .max()
            .unwrap_or(0);
        let handed_out = inner.allocated.get(entity_id).copied().unwrap_or(0);
        let next = stored_max.max(handed_out) + 1;
        inner.allocated.insert(entity_id.to_string(), next);
        Ok(VersionNumber::Committed(next))
    }

    async fn find_field(
        &self,
        field_id: &str,
    ) -> Result<Option<EntityFieldRecord>, StorageError> {
        let inner = self.lock();
        Ok(inner.fields.iter().find(|f| f.id == field_id).cloned())
    }

    async fn list_fields(
        &self,
        args: FieldListArgs,
    ) -> Result<Vec<EntityFieldRecord>, StorageError> {
        let inner = self.lock();
        let scoped_version_id = match inner.resolve_field_scope(&args.filter) {
            Some(resolved) => resolved,
            None => return Ok(Vec::new()),
        };
        let take = args.take.unwrap_or(usize::MAX);
        Ok(inner
            .fields
            .iter()
            .filter(|f| field_matches(&args.filter, scoped_version_id.as_deref(), f))
            .take(take)
            .cloned()
            .collect())
    }

    async fn create_field(&self, new: NewEntityField) -> Result<EntityFieldRecord, StorageError> {
        let mut inner = self.lock();
        let now = now_rfc3339();
        let record = EntityFieldRecord {
            id: new_id(),
            permanent_id: new.permanent_id.unwrap_or_else(new_id),
            created_at: now.clone(),
            updated_at: now,
            entity_version_id: new.entity_version_id,
            name: new.name,
            display_name: new.display_name,
            data_type: new.data_type,
            properties: new.properties,
            required: new.required,
            searchable: new.searchable,
            description: new.description,
        };
        inner.fields.push(record.clone());
        Ok(record)
    }

    async fn update_field(
        &self,
        field_id: &str,
        patch: FieldPatch,
    ) -> Result<EntityFieldRecord, StorageError> {
        let mut inner = self.lock();
        let record = inner
            .fields
            .iter_mut()
            .find(|f| f.id == field_id)
            .ok_or_else(|| StorageError::not_found("entity_field", field_id))?;
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(display_name) = patch.display_name {
            record.display_name = display_name;
        }
        if let Some(data_type) = patch.data_type {
            record.data_type = data_type;
        }
        if let Some(properties) = patch.properties {
            record.properties = properties;
        }
        if let Some(required) = patch.required {
            record.required = required;
        }
        if let Some(searchable) = patch.searchable {
            record.searchable = searchable;
        }
        patch.description.apply(&mut record.description);
        record.updated_at = now_rfc3339();
        Ok(record.clone())
    }

    async fn create_commit(&self, new: NewCommit) -> Result<CommitRecord, StorageError> {
        let mut inner = self.lock();
        let record = CommitRecord {
            id: new_id(),
            created_at: now_rfc3339(),
            user_id: new.user_id,
            message: new.message,
        };
        inner.commits.push(record.clone());
        Ok(record)
    }

    async fn find_commit(&self, commit_id: &str) -> Result<Option<CommitRecord>, StorageError> {
        let inner = self.lock();
        Ok(inner.commits.iter().find(|c| c.id == commit_id).cloned())
    }
}
