use appforge_storage::{
    DataType, EntityFilter, EntityListArgs, FieldFilter, FieldListArgs, FieldPatch, MemoryStore,
    NewCommit, Patch, VersionFilter, VersionListArgs, VersionNumber,
};
use serde_json::json;

use super::*;
use crate::error::EntityError;
use crate::name::NAME_VALIDATION_ERROR_MESSAGE;

fn service() -> EntityService<MemoryStore> {
    EntityService::new(MemoryStore::new()).unwrap()
}

fn example_entity_input() -> CreateEntityInput {
    CreateEntityInput {
        app_id: "exampleApp".to_string(),
        name: "exampleEntity".to_string(),
        display_name: "Example Entity".to_string(),
        plural_display_name: "Example Entities".to_string(),
        description: Some("example entity".to_string()),
    }
}

async fn create_example_entity(svc: &EntityService<MemoryStore>) -> EntityRecord {
    svc.create_entity(example_entity_input(), "exampleUserId")
        .await
        .unwrap()
}

fn example_field_input(entity_id: &str, name: &str) -> CreateFieldInput {
    CreateFieldInput {
        entity_id: entity_id.to_string(),
        name: name.to_string(),
        display_name: "Example Field".to_string(),
        data_type: DataType::SingleLineText,
        properties: json!({ "maxLength": 42 }),
        required: false,
        searchable: true,
        description: None,
    }
}

async fn commit_id(svc: &EntityService<MemoryStore>) -> String {
    svc.store()
        .create_commit(NewCommit {
            user_id: "exampleUserId".to_string(),
            message: "example commit".to_string(),
        })
        .await
        .unwrap()
        .id
}

// ── Creation ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_entity_locks_to_creator() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    assert_eq!(entity.locked_by_user_id.as_deref(), Some("exampleUserId"));
    assert!(entity.locked_at.is_some());
    assert_eq!(entity.app_id, "exampleApp");
}

#[tokio::test]
async fn create_entity_creates_draft_mirroring_metadata() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let draft = svc
        .store()
        .find_version(VersionFilter::draft_of(&entity.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(draft.number, VersionNumber::Draft);
    assert_eq!(draft.commit_id, None);
    assert_eq!(draft.name, entity.name);
    assert_eq!(draft.display_name, entity.display_name);
    assert_eq!(draft.plural_display_name, entity.plural_display_name);
    assert_eq!(draft.description, entity.description);
    assert!(!draft.deleted);
}

#[tokio::test]
async fn create_entity_rejects_invalid_name() {
    let svc = service();
    let mut input = example_entity_input();
    input.name = "Foo Bar".to_string();
    let err = svc.create_entity(input, "exampleUserId").await.unwrap_err();
    assert_eq!(err.to_string(), NAME_VALIDATION_ERROR_MESSAGE);
}

// ── Lookup and listing ───────────────────────────────────────────────────────

#[tokio::test]
async fn entity_finds_by_id() {
    let svc = service();
    let created = create_example_entity(&svc).await;
    let found = svc.entity(EntityFilter::by_id(&created.id)).await.unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.name, "exampleEntity");
}

#[tokio::test]
async fn entity_missing_is_not_found() {
    let svc = service();
    let err = svc.entity(EntityFilter::by_id("no-such")).await.unwrap_err();
    assert!(matches!(err, EntityError::EntityNotFound { entity_id } if entity_id == "no-such"));
}

#[tokio::test]
async fn deleted_entities_are_invisible_even_when_requested() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    svc.delete_entity(&entity.id).await.unwrap();

    let err = svc
        .entity(EntityFilter {
            id: Some(entity.id.clone()),
            include_deleted: true,
            ..EntityFilter::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EntityError::EntityNotFound { .. }));

    let listed = svc
        .entities(EntityListArgs {
            filter: EntityFilter {
                app_id: Some("exampleApp".to_string()),
                include_deleted: true,
                ..EntityFilter::default()
            },
            ..EntityListArgs::default()
        })
        .await
        .unwrap();
    assert!(listed.is_empty());
}

// ── Soft deletion ────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_renames_and_stamps_deleted_at() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let deleted = svc.delete_entity(&entity.id).await.unwrap();
    assert_eq!(
        deleted.name,
        format!("exampleEntity__deleted__{}", entity.id)
    );
    assert!(deleted.display_name.contains("__deleted__"));
    assert!(deleted.plural_display_name.contains("__deleted__"));
    assert!(deleted.deleted_at.is_some());
}

#[tokio::test]
async fn delete_marks_draft_deleted_and_retains_rows() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    svc.delete_entity(&entity.id).await.unwrap();

    // The rows survive at the storage layer for history.
    let stored = svc
        .store()
        .find_entity(EntityFilter {
            id: Some(entity.id.clone()),
            include_deleted: true,
            ..EntityFilter::default()
        })
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_deleted());

    let draft = svc
        .store()
        .find_version(VersionFilter::draft_of(&entity.id))
        .await
        .unwrap()
        .unwrap();
    assert!(draft.deleted);
}

#[tokio::test]
async fn delete_frees_the_name_for_reuse() {
    let svc = service();
    let first = create_example_entity(&svc).await;
    svc.delete_entity(&first.id).await.unwrap();
    let second = create_example_entity(&svc).await;
    assert_ne!(second.id, first.id);
    assert_eq!(second.name, "exampleEntity");
}

#[tokio::test]
async fn delete_missing_entity_is_not_found() {
    let svc = service();
    let err = svc.delete_entity("no-such").await.unwrap_err();
    assert!(matches!(err, EntityError::EntityNotFound { .. }));
}

// ── Update ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_propagates_metadata_to_draft() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let updated = svc
        .update_entity(
            &entity.id,
            UpdateEntityInput {
                name: Some("renamedEntity".to_string()),
                display_name: Some("Renamed".to_string()),
                description: Patch::Clear,
                ..UpdateEntityInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "renamedEntity");
    assert_eq!(updated.description, None);
    // Untouched column keeps its value.
    assert_eq!(updated.plural_display_name, "Example Entities");

    let draft = svc
        .store()
        .find_version(VersionFilter::draft_of(&entity.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(draft.name, "renamedEntity");
    assert_eq!(draft.display_name, "Renamed");
    assert_eq!(draft.description, None);
    assert_eq!(draft.plural_display_name, "Example Entities");
}

#[tokio::test]
async fn update_rejects_invalid_name() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let err = svc
        .update_entity(
            &entity.id,
            UpdateEntityInput {
                name: Some("Foo Bar".to_string()),
                ..UpdateEntityInput::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), NAME_VALIDATION_ERROR_MESSAGE);
}

// ── Fields ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_field_attaches_to_draft() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let field = svc
        .create_field(example_field_input(&entity.id, "exampleEntityFieldName"))
        .await
        .unwrap();
    assert_eq!(field.name, "exampleEntityFieldName");
    assert_eq!(field.data_type, DataType::SingleLineText);
    assert!(!field.permanent_id.is_empty());

    let fields = svc
        .get_entity_fields(&entity.id, VersionNumber::Draft, FieldListArgs::default())
        .await
        .unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].id, field.id);
}

#[tokio::test]
async fn create_field_rejects_invalid_name() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let err = svc
        .create_field(example_field_input(&entity.id, "Foo Bar"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), NAME_VALIDATION_ERROR_MESSAGE);
}

#[tokio::test]
async fn create_field_rejects_invalid_properties() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let mut input = example_field_input(&entity.id, "exampleEntityFieldName");
    input.properties = json!({ "maxLength": "not a number" });
    let err = svc.create_field(input).await.unwrap_err();
    assert!(matches!(err, EntityError::InvalidProperties { .. }));
}

#[tokio::test]
async fn update_field_applies_patch() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let field = svc
        .create_field(example_field_input(&entity.id, "exampleEntityFieldName"))
        .await
        .unwrap();
    let updated = svc
        .update_field(
            &field.id,
            FieldPatch {
                required: Some(true),
                description: Patch::Set("now required".to_string()),
                ..FieldPatch::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.required);
    assert_eq!(updated.description.as_deref(), Some("now required"));
    assert_eq!(updated.name, "exampleEntityFieldName");
}

#[tokio::test]
async fn get_entity_fields_is_scoped_to_the_requested_version() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    svc.create_field(example_field_input(&entity.id, "keptField"))
        .await
        .unwrap();
    let commit = commit_id(&svc).await;
    svc.create_version(CreateVersionInput {
        entity_id: entity.id.clone(),
        commit_id: commit,
    })
    .await
    .unwrap();
    svc.create_field(example_field_input(&entity.id, "draftOnlyField"))
        .await
        .unwrap();

    let committed = svc
        .get_entity_fields(
            &entity.id,
            VersionNumber::Committed(1),
            FieldListArgs::default(),
        )
        .await
        .unwrap();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].name, "keptField");

    let draft = svc
        .get_entity_fields(&entity.id, VersionNumber::Draft, FieldListArgs::default())
        .await
        .unwrap();
    let names: Vec<&str> = draft.iter().map(|f| f.name.as_str()).collect();
    assert!(names.contains(&"keptField"));
    assert!(names.contains(&"draftOnlyField"));
}

// ── Versioning ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_version_assigns_sequential_numbers() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let first = svc
        .create_version(CreateVersionInput {
            entity_id: entity.id.clone(),
            commit_id: commit_id(&svc).await,
        })
        .await
        .unwrap();
    let second = svc
        .create_version(CreateVersionInput {
            entity_id: entity.id.clone(),
            commit_id: commit_id(&svc).await,
        })
        .await
        .unwrap();
    assert_eq!(first.number, VersionNumber::Committed(1));
    assert_eq!(second.number, VersionNumber::Committed(2));
}

#[tokio::test]
async fn create_version_copies_draft_fields_with_stable_permanent_ids() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let draft_field = svc
        .create_field(example_field_input(&entity.id, "exampleEntityFieldName"))
        .await
        .unwrap();
    let version = svc
        .create_version(CreateVersionInput {
            entity_id: entity.id.clone(),
            commit_id: commit_id(&svc).await,
        })
        .await
        .unwrap();

    let copies = svc
        .store()
        .list_fields(FieldListArgs {
            filter: FieldFilter {
                entity_version_id: Some(version.id.clone()),
                ..FieldFilter::default()
            },
            take: None,
        })
        .await
        .unwrap();
    assert_eq!(copies.len(), 1);
    assert_ne!(copies[0].id, draft_field.id);
    assert_eq!(copies[0].permanent_id, draft_field.permanent_id);
    assert_eq!(copies[0].name, draft_field.name);
    assert_eq!(copies[0].properties, draft_field.properties);
}

#[tokio::test]
async fn create_version_snapshots_draft_metadata_and_commit() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let commit = commit_id(&svc).await;
    let version = svc
        .create_version(CreateVersionInput {
            entity_id: entity.id.clone(),
            commit_id: commit.clone(),
        })
        .await
        .unwrap();
    assert_eq!(version.commit_id.as_deref(), Some(commit.as_str()));
    assert_eq!(version.name, "exampleEntity");
    assert_eq!(version.display_name, "Example Entity");
}

#[tokio::test]
async fn get_versions_lists_for_an_entity() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    svc.create_version(CreateVersionInput {
        entity_id: entity.id.clone(),
        commit_id: commit_id(&svc).await,
    })
    .await
    .unwrap();

    let versions = svc
        .get_versions(VersionListArgs {
            filter: VersionFilter {
                entity_id: Some(entity.id.clone()),
                ..VersionFilter::default()
            },
            ..VersionListArgs::default()
        })
        .await
        .unwrap();
    assert_eq!(versions.len(), 2);
}

#[tokio::test]
async fn get_version_commit_returns_the_linked_commit() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let commit = commit_id(&svc).await;
    let version = svc
        .create_version(CreateVersionInput {
            entity_id: entity.id.clone(),
            commit_id: commit.clone(),
        })
        .await
        .unwrap();
    let found = svc.get_version_commit(&version.id).await.unwrap();
    assert_eq!(found.id, commit);
    assert_eq!(found.user_id, "exampleUserId");
}

#[tokio::test]
async fn get_version_commit_of_draft_is_commit_not_found() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let draft = svc
        .store()
        .find_version(VersionFilter::draft_of(&entity.id))
        .await
        .unwrap()
        .unwrap();
    let err = svc.get_version_commit(&draft.id).await.unwrap_err();
    assert!(matches!(err, EntityError::CommitNotFound { .. }));
}

// ── Cross-entity validation ──────────────────────────────────────────────────

#[tokio::test]
async fn is_entity_in_same_app_checks_app_membership() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    assert!(svc
        .is_entity_in_same_app(&entity.id, "exampleApp")
        .await
        .unwrap());
    assert!(!svc
        .is_entity_in_same_app(&entity.id, "otherApp")
        .await
        .unwrap());
    assert!(!svc
        .is_entity_in_same_app("no-such", "exampleApp")
        .await
        .unwrap());
}

#[tokio::test]
async fn validate_all_fields_exist_reports_only_the_missing() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    svc.create_field(example_field_input(&entity.id, "exampleFieldName"))
        .await
        .unwrap();
    let missing = svc
        .validate_all_fields_exist(
            &entity.id,
            &[
                "exampleFieldName".to_string(),
                "nonExistingFieldName".to_string(),
            ],
        )
        .await
        .unwrap();
    assert_eq!(missing.len(), 1);
    assert!(missing.contains("nonExistingFieldName"));
}

#[tokio::test]
async fn validate_all_fields_exist_collapses_duplicates() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let missing = svc
        .validate_all_fields_exist(
            &entity.id,
            &[
                "nonExistingFieldName".to_string(),
                "nonExistingFieldName".to_string(),
            ],
        )
        .await
        .unwrap();
    assert_eq!(missing.len(), 1);
}

// ── Locking ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reacquiring_own_lock_is_a_noop() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let locked = svc
        .acquire_lock(&entity.id, "exampleUserId")
        .await
        .unwrap();
    assert_eq!(locked.locked_by_user_id.as_deref(), Some("exampleUserId"));
    assert_eq!(locked.locked_at, entity.locked_at);
}

#[tokio::test]
async fn lock_held_by_another_user_conflicts() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let err = svc
        .acquire_lock(&entity.id, "otherUserId")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EntityError::LockConflict { locked_by_user_id, .. } if locked_by_user_id == "exampleUserId"
    ));
}

#[tokio::test]
async fn released_lock_can_be_acquired_by_anyone() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    let released = svc.release_lock(&entity.id).await.unwrap();
    assert_eq!(released.locked_by_user_id, None);
    assert_eq!(released.locked_at, None);

    let locked = svc.acquire_lock(&entity.id, "otherUserId").await.unwrap();
    assert_eq!(locked.locked_by_user_id.as_deref(), Some("otherUserId"));
    assert!(locked.locked_at.is_some());
}

#[tokio::test]
async fn release_is_idempotent() {
    let svc = service();
    let entity = create_example_entity(&svc).await;
    svc.release_lock(&entity.id).await.unwrap();
    let again = svc.release_lock(&entity.id).await.unwrap();
    assert_eq!(again.locked_by_user_id, None);
}
