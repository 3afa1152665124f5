use std::future::Future;

use super::{make_entity, TestResult};
use crate::args::{EntityFilter, EntityListArgs, EntityOrderBy, EntityPatch, Patch, SortOrder};
use crate::{DataStore, StorageError};

pub(super) async fn run_entity_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "entity",
        "create_then_find_by_id",
        create_then_find_by_id(factory).await,
    ));
    results.push(TestResult::from_result(
        "entity",
        "find_missing_returns_none",
        find_missing_returns_none(factory).await,
    ));
    results.push(TestResult::from_result(
        "entity",
        "filter_by_app_and_name",
        filter_by_app_and_name(factory).await,
    ));
    results.push(TestResult::from_result(
        "entity",
        "default_filter_excludes_soft_deleted",
        default_filter_excludes_soft_deleted(factory).await,
    ));
    results.push(TestResult::from_result(
        "entity",
        "include_deleted_reveals_soft_deleted",
        include_deleted_reveals_soft_deleted(factory).await,
    ));
    results.push(TestResult::from_result(
        "entity",
        "list_orders_by_name",
        list_orders_by_name(factory).await,
    ));
    results.push(TestResult::from_result(
        "entity",
        "list_respects_skip_and_take",
        list_respects_skip_and_take(factory).await,
    ));
    results.push(TestResult::from_result(
        "entity",
        "patch_sets_and_clears_lock_columns",
        patch_sets_and_clears_lock_columns(factory).await,
    ));
    results.push(TestResult::from_result(
        "entity",
        "patch_keep_leaves_columns_untouched",
        patch_keep_leaves_columns_untouched(factory).await,
    ));
    results.push(TestResult::from_result(
        "entity",
        "update_missing_entity_is_record_not_found",
        update_missing_entity_is_record_not_found(factory).await,
    ));

    results
}

async fn create_then_find_by_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let created = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    if created.id.is_empty() {
        return Err("created entity has empty id".to_string());
    }
    let found = s
        .find_entity(EntityFilter::by_id(&created.id))
        .await
        .map_err(|e| e.to_string())?
        .ok_or("created entity not found by id")?;
    if found.name != "order" {
        return Err(format!("expected name 'order', got '{}'", found.name));
    }
    Ok(())
}

async fn find_missing_returns_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let found = s
        .find_entity(EntityFilter::by_id("no-such-id"))
        .await
        .map_err(|e| e.to_string())?;
    if found.is_some() {
        return Err("find of missing entity returned a record".to_string());
    }
    Ok(())
}

async fn filter_by_app_and_name<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut order = make_entity("order");
    order.app_id = "app-a".to_string();
    let mut invoice = make_entity("invoice");
    invoice.app_id = "app-b".to_string();
    s.create_entity(order).await.map_err(|e| e.to_string())?;
    s.create_entity(invoice).await.map_err(|e| e.to_string())?;

    let filter = EntityFilter {
        app_id: Some("app-a".to_string()),
        ..EntityFilter::default()
    };
    let listed = s
        .list_entities(EntityListArgs {
            filter,
            ..EntityListArgs::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    if listed.len() != 1 || listed[0].name != "order" {
        return Err(format!("app filter matched {} records", listed.len()));
    }

    let filter = EntityFilter {
        name: Some("invoice".to_string()),
        ..EntityFilter::default()
    };
    let found = s.find_entity(filter).await.map_err(|e| e.to_string())?;
    if found.map(|e| e.app_id) != Some("app-b".to_string()) {
        return Err("name filter did not match the invoice entity".to_string());
    }
    Ok(())
}

async fn default_filter_excludes_soft_deleted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let created = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    s.update_entity(
        &created.id,
        EntityPatch {
            deleted_at: Patch::Set("2026-01-01T00:00:00Z".to_string()),
            ..EntityPatch::default()
        },
    )
    .await
    .map_err(|e| e.to_string())?;

    let found = s
        .find_entity(EntityFilter::by_id(&created.id))
        .await
        .map_err(|e| e.to_string())?;
    if found.is_some() {
        return Err("soft-deleted entity visible through default filter".to_string());
    }
    let listed = s
        .list_entities(EntityListArgs::default())
        .await
        .map_err(|e| e.to_string())?;
    if !listed.is_empty() {
        return Err("soft-deleted entity listed through default filter".to_string());
    }
    Ok(())
}

async fn include_deleted_reveals_soft_deleted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let created = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    s.update_entity(
        &created.id,
        EntityPatch {
            deleted_at: Patch::Set("2026-01-01T00:00:00Z".to_string()),
            ..EntityPatch::default()
        },
    )
    .await
    .map_err(|e| e.to_string())?;

    let filter = EntityFilter {
        id: Some(created.id.clone()),
        include_deleted: true,
        ..EntityFilter::default()
    };
    let found = s
        .find_entity(filter)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("soft-deleted entity not retained")?;
    if found.deleted_at.is_none() {
        return Err("retained row lost its deleted_at timestamp".to_string());
    }
    Ok(())
}

async fn list_orders_by_name<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for name in ["charlie", "alpha", "bravo"] {
        s.create_entity(make_entity(name))
            .await
            .map_err(|e| e.to_string())?;
    }
    let listed = s
        .list_entities(EntityListArgs {
            order_by: Some(EntityOrderBy::Name(SortOrder::Asc)),
            ..EntityListArgs::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
    if names != ["alpha", "bravo", "charlie"] {
        return Err(format!("expected sorted names, got {names:?}"));
    }
    Ok(())
}

async fn list_respects_skip_and_take<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for name in ["alpha", "bravo", "charlie", "delta"] {
        s.create_entity(make_entity(name))
            .await
            .map_err(|e| e.to_string())?;
    }
    let listed = s
        .list_entities(EntityListArgs {
            order_by: Some(EntityOrderBy::Name(SortOrder::Asc)),
            skip: Some(1),
            take: Some(2),
            ..EntityListArgs::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
    if names != ["bravo", "charlie"] {
        return Err(format!("expected page [bravo, charlie], got {names:?}"));
    }
    Ok(())
}

async fn patch_sets_and_clears_lock_columns<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let created = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;

    let locked = s
        .update_entity(
            &created.id,
            EntityPatch {
                locked_by_user_id: Patch::Set("user-1".to_string()),
                locked_at: Patch::Set("2026-01-01T00:00:00Z".to_string()),
                ..EntityPatch::default()
            },
        )
        .await
        .map_err(|e| e.to_string())?;
    if locked.locked_by_user_id.as_deref() != Some("user-1") || locked.locked_at.is_none() {
        return Err("lock columns not set by patch".to_string());
    }

    let released = s
        .update_entity(
            &created.id,
            EntityPatch {
                locked_by_user_id: Patch::Clear,
                locked_at: Patch::Clear,
                ..EntityPatch::default()
            },
        )
        .await
        .map_err(|e| e.to_string())?;
    if released.locked_by_user_id.is_some() || released.locked_at.is_some() {
        return Err("lock columns not cleared by patch".to_string());
    }
    Ok(())
}

async fn patch_keep_leaves_columns_untouched<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut new = make_entity("order");
    new.description = Some("kept".to_string());
    new.locked_by_user_id = Some("user-1".to_string());
    let created = s.create_entity(new).await.map_err(|e| e.to_string())?;

    let updated = s
        .update_entity(
            &created.id,
            EntityPatch {
                display_name: Some("Renamed".to_string()),
                ..EntityPatch::default()
            },
        )
        .await
        .map_err(|e| e.to_string())?;
    if updated.description.as_deref() != Some("kept") {
        return Err("Keep patch cleared the description".to_string());
    }
    if updated.locked_by_user_id.as_deref() != Some("user-1") {
        return Err("Keep patch cleared the lock holder".to_string());
    }
    if updated.display_name != "Renamed" {
        return Err("Some patch did not apply".to_string());
    }
    Ok(())
}

async fn update_missing_entity_is_record_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let err = s
        .update_entity("no-such-id", EntityPatch::default())
        .await
        .err()
        .ok_or("update of missing entity succeeded")?;
    match err {
        StorageError::RecordNotFound { .. } => Ok(()),
        other => Err(format!("expected RecordNotFound, got: {other}")),
    }
}
