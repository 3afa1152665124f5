use std::collections::BTreeSet;
use std::future::Future;

use super::{make_entity, make_field, make_version, TestResult};
use crate::args::{FieldFilter, FieldListArgs, FieldPatch, VersionScope};
use crate::record::VersionNumber;
use crate::DataStore;

pub(super) async fn run_field_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "field",
        "create_then_find_by_id",
        create_then_find_by_id(factory).await,
    ));
    results.push(TestResult::from_result(
        "field",
        "list_scoped_to_version_id",
        list_scoped_to_version_id(factory).await,
    ));
    results.push(TestResult::from_result(
        "field",
        "name_in_filters_by_name_set",
        name_in_filters_by_name_set(factory).await,
    ));
    results.push(TestResult::from_result(
        "field",
        "entity_scope_resolves_through_version_table",
        entity_scope_resolves_through_version_table(factory).await,
    ));
    results.push(TestResult::from_result(
        "field",
        "entity_scope_of_missing_version_matches_nothing",
        entity_scope_of_missing_version_matches_nothing(factory).await,
    ));
    results.push(TestResult::from_result(
        "field",
        "permanent_id_is_carried_forward",
        permanent_id_is_carried_forward(factory).await,
    ));
    results.push(TestResult::from_result(
        "field",
        "patch_updates_field_columns",
        patch_updates_field_columns(factory).await,
    ));

    results
}

/// Create an entity with a draft version and return (entity_id, version_id).
async fn seed_draft<S: DataStore>(s: &S) -> Result<(String, String), String> {
    let entity = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    let draft = s
        .create_version(make_version(&entity.id, VersionNumber::Draft))
        .await
        .map_err(|e| e.to_string())?;
    Ok((entity.id, draft.id))
}

async fn create_then_find_by_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, version_id) = seed_draft(&s).await?;
    let created = s
        .create_field(make_field(&version_id, "customer_name"))
        .await
        .map_err(|e| e.to_string())?;
    if created.permanent_id.is_empty() {
        return Err("store did not mint a permanent id".to_string());
    }
    let found = s
        .find_field(&created.id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("created field not found by id")?;
    if found.name != "customer_name" || found.entity_version_id != version_id {
        return Err("field round-trip lost columns".to_string());
    }
    Ok(())
}

async fn list_scoped_to_version_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (entity_id, draft_id) = seed_draft(&s).await?;
    let snapshot = s
        .create_version(make_version(&entity_id, VersionNumber::Committed(1)))
        .await
        .map_err(|e| e.to_string())?;
    s.create_field(make_field(&draft_id, "draft_field"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_field(make_field(&snapshot.id, "snapshot_field"))
        .await
        .map_err(|e| e.to_string())?;

    let listed = s
        .list_fields(FieldListArgs {
            filter: FieldFilter {
                entity_version_id: Some(draft_id),
                ..FieldFilter::default()
            },
            take: None,
        })
        .await
        .map_err(|e| e.to_string())?;
    if listed.len() != 1 || listed[0].name != "draft_field" {
        return Err(format!("version scope matched {} fields", listed.len()));
    }
    Ok(())
}

async fn name_in_filters_by_name_set<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, version_id) = seed_draft(&s).await?;
    for name in ["alpha", "bravo", "charlie"] {
        s.create_field(make_field(&version_id, name))
            .await
            .map_err(|e| e.to_string())?;
    }
    let names: BTreeSet<String> = ["alpha", "charlie", "missing"]
        .into_iter()
        .map(String::from)
        .collect();
    let listed = s
        .list_fields(FieldListArgs {
            filter: FieldFilter {
                entity_version_id: Some(version_id),
                name_in: Some(names),
                ..FieldFilter::default()
            },
            take: None,
        })
        .await
        .map_err(|e| e.to_string())?;
    let mut found: Vec<&str> = listed.iter().map(|f| f.name.as_str()).collect();
    found.sort();
    if found != ["alpha", "charlie"] {
        return Err(format!("name_in matched {found:?}"));
    }
    Ok(())
}

async fn entity_scope_resolves_through_version_table<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (entity_id, draft_id) = seed_draft(&s).await?;
    s.create_field(make_field(&draft_id, "scoped"))
        .await
        .map_err(|e| e.to_string())?;

    let listed = s
        .list_fields(FieldListArgs {
            filter: FieldFilter {
                entity_scope: Some(VersionScope {
                    entity_id,
                    number: VersionNumber::Draft,
                }),
                ..FieldFilter::default()
            },
            take: None,
        })
        .await
        .map_err(|e| e.to_string())?;
    if listed.len() != 1 || listed[0].name != "scoped" {
        return Err(format!("entity scope matched {} fields", listed.len()));
    }
    Ok(())
}

async fn entity_scope_of_missing_version_matches_nothing<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (entity_id, draft_id) = seed_draft(&s).await?;
    s.create_field(make_field(&draft_id, "present"))
        .await
        .map_err(|e| e.to_string())?;

    let listed = s
        .list_fields(FieldListArgs {
            filter: FieldFilter {
                entity_scope: Some(VersionScope {
                    entity_id,
                    number: VersionNumber::Committed(9),
                }),
                ..FieldFilter::default()
            },
            take: None,
        })
        .await
        .map_err(|e| e.to_string())?;
    if !listed.is_empty() {
        return Err("scope over a missing version matched fields".to_string());
    }
    Ok(())
}

async fn permanent_id_is_carried_forward<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (entity_id, draft_id) = seed_draft(&s).await?;
    let original = s
        .create_field(make_field(&draft_id, "carried"))
        .await
        .map_err(|e| e.to_string())?;

    let snapshot = s
        .create_version(make_version(&entity_id, VersionNumber::Committed(1)))
        .await
        .map_err(|e| e.to_string())?;
    let mut copy = make_field(&snapshot.id, "carried");
    copy.permanent_id = Some(original.permanent_id.clone());
    let copied = s.create_field(copy).await.map_err(|e| e.to_string())?;

    if copied.id == original.id {
        return Err("copy reused the original row id".to_string());
    }
    if copied.permanent_id != original.permanent_id {
        return Err("copy did not keep the permanent id".to_string());
    }
    Ok(())
}

async fn patch_updates_field_columns<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let (_, version_id) = seed_draft(&s).await?;
    let created = s
        .create_field(make_field(&version_id, "patchable"))
        .await
        .map_err(|e| e.to_string())?;
    let updated = s
        .update_field(
            &created.id,
            FieldPatch {
                required: Some(true),
                properties: Some(serde_json::json!({ "maxLength": 100 })),
                ..FieldPatch::default()
            },
        )
        .await
        .map_err(|e| e.to_string())?;
    if !updated.required {
        return Err("required flag not patched".to_string());
    }
    if updated.properties["maxLength"] != 100 {
        return Err("properties payload not patched".to_string());
    }
    if updated.name != "patchable" {
        return Err("unpatched column changed".to_string());
    }
    Ok(())
}
