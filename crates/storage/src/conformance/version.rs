use std::future::Future;

use super::{make_entity, make_version, TestResult};
use crate::args::{SortOrder, VersionFilter, VersionListArgs, VersionOrderBy, VersionPatch};
use crate::record::VersionNumber;
use crate::{DataStore, StorageError};

pub(super) async fn run_version_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "version",
        "create_then_find_by_entity_and_number",
        create_then_find_by_entity_and_number(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "duplicate_number_is_rejected",
        duplicate_number_is_rejected(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "list_orders_draft_first_ascending",
        list_orders_draft_first_ascending(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "allocation_starts_at_one",
        allocation_starts_at_one(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "allocation_increments_sequentially",
        allocation_increments_sequentially(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "allocation_accounts_for_existing_rows",
        allocation_accounts_for_existing_rows(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "allocation_is_per_entity",
        allocation_is_per_entity(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "patch_marks_draft_deleted",
        patch_marks_draft_deleted(factory).await,
    ));
    results.push(TestResult::from_result(
        "version",
        "update_missing_version_is_record_not_found",
        update_missing_version_is_record_not_found(factory).await,
    ));

    results
}

async fn create_then_find_by_entity_and_number<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let entity = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_version(make_version(&entity.id, VersionNumber::Draft))
        .await
        .map_err(|e| e.to_string())?;

    let found = s
        .find_version(VersionFilter::draft_of(&entity.id))
        .await
        .map_err(|e| e.to_string())?
        .ok_or("draft version not found by (entity_id, number)")?;
    if !found.number.is_draft() {
        return Err(format!("expected draft, got {}", found.number));
    }
    if found.commit_id.is_some() {
        return Err("draft version carries a commit link".to_string());
    }
    Ok(())
}

async fn duplicate_number_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let entity = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_version(make_version(&entity.id, VersionNumber::Committed(1)))
        .await
        .map_err(|e| e.to_string())?;
    let err = s
        .create_version(make_version(&entity.id, VersionNumber::Committed(1)))
        .await
        .err()
        .ok_or("second row with the same (entity_id, number) was accepted")?;
    match err {
        StorageError::DuplicateRecord { .. } => Ok(()),
        other => Err(format!("expected DuplicateRecord, got: {other}")),
    }
}

async fn list_orders_draft_first_ascending<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let entity = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    for number in [
        VersionNumber::Committed(2),
        VersionNumber::Draft,
        VersionNumber::Committed(1),
    ] {
        s.create_version(make_version(&entity.id, number))
            .await
            .map_err(|e| e.to_string())?;
    }
    let listed = s
        .list_versions(VersionListArgs {
            filter: VersionFilter {
                entity_id: Some(entity.id.clone()),
                ..VersionFilter::default()
            },
            order_by: Some(VersionOrderBy::Number(SortOrder::Asc)),
            take: None,
        })
        .await
        .map_err(|e| e.to_string())?;
    let numbers: Vec<u32> = listed.iter().map(|v| v.number.as_number()).collect();
    if numbers != [0, 1, 2] {
        return Err(format!("expected [0, 1, 2], got {numbers:?}"));
    }
    Ok(())
}

async fn allocation_starts_at_one<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let entity = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_version(make_version(&entity.id, VersionNumber::Draft))
        .await
        .map_err(|e| e.to_string())?;
    let number = s
        .allocate_version_number(&entity.id)
        .await
        .map_err(|e| e.to_string())?;
    if number != VersionNumber::Committed(1) {
        return Err(format!("expected v1, got {number}"));
    }
    Ok(())
}

async fn allocation_increments_sequentially<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let entity = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_version(make_version(&entity.id, VersionNumber::Draft))
        .await
        .map_err(|e| e.to_string())?;
    for expected in 1..=3u32 {
        let number = s
            .allocate_version_number(&entity.id)
            .await
            .map_err(|e| e.to_string())?;
        if number != VersionNumber::Committed(expected) {
            return Err(format!("expected v{expected}, got {number}"));
        }
        s.create_version(make_version(&entity.id, number))
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

async fn allocation_accounts_for_existing_rows<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let entity = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_version(make_version(&entity.id, VersionNumber::Committed(3)))
        .await
        .map_err(|e| e.to_string())?;
    let number = s
        .allocate_version_number(&entity.id)
        .await
        .map_err(|e| e.to_string())?;
    if number != VersionNumber::Committed(4) {
        return Err(format!("expected v4 after existing v3, got {number}"));
    }
    Ok(())
}

async fn allocation_is_per_entity<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let order = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    let invoice = s
        .create_entity(make_entity("invoice"))
        .await
        .map_err(|e| e.to_string())?;
    s.create_version(make_version(&order.id, VersionNumber::Committed(5)))
        .await
        .map_err(|e| e.to_string())?;

    let number = s
        .allocate_version_number(&invoice.id)
        .await
        .map_err(|e| e.to_string())?;
    if number != VersionNumber::Committed(1) {
        return Err(format!(
            "allocation leaked across entities: expected v1, got {number}"
        ));
    }
    Ok(())
}

async fn patch_marks_draft_deleted<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let entity = s
        .create_entity(make_entity("order"))
        .await
        .map_err(|e| e.to_string())?;
    let draft = s
        .create_version(make_version(&entity.id, VersionNumber::Draft))
        .await
        .map_err(|e| e.to_string())?;
    let updated = s
        .update_version(
            &draft.id,
            VersionPatch {
                deleted: Some(true),
                ..VersionPatch::default()
            },
        )
        .await
        .map_err(|e| e.to_string())?;
    if !updated.deleted {
        return Err("deleted flag not set by patch".to_string());
    }
    Ok(())
}

async fn update_missing_version_is_record_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let err = s
        .update_version("no-such-id", VersionPatch::default())
        .await
        .err()
        .ok_or("update of missing version succeeded")?;
    match err {
        StorageError::RecordNotFound { .. } => Ok(()),
        other => Err(format!("expected RecordNotFound, got: {other}")),
    }
}
