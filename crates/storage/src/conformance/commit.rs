use std::future::Future;

use super::TestResult;
use crate::record::NewCommit;
use crate::DataStore;

pub(super) async fn run_commit_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "commit",
        "create_then_find_by_id",
        create_then_find_by_id(factory).await,
    ));
    results.push(TestResult::from_result(
        "commit",
        "missing_commit_is_none",
        missing_commit_is_none(factory).await,
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
        .create_commit(NewCommit {
            user_id: "user-1".to_string(),
            message: "initial commit".to_string(),
        })
        .await
        .map_err(|e| e.to_string())?;
    let found = s
        .find_commit(&created.id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("created commit not found by id")?;
    if found.message != "initial commit" || found.user_id != "user-1" {
        return Err("commit round-trip lost columns".to_string());
    }
    Ok(())
}

async fn missing_commit_is_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let found = s
        .find_commit("no-such-commit")
        .await
        .map_err(|e| e.to_string())?;
    if found.is_some() {
        return Err("find of missing commit returned a record".to_string());
    }
    Ok(())
}
