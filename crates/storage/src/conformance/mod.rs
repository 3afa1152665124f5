//! Conformance test suite for [`DataStore`] implementations.
//!
//! This module provides a backend-agnostic test suite that any `DataStore`
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Entities**: create/find/list round-trips, filter semantics, the
//!   `include_deleted` visibility rule, patch semantics (keep/set/clear)
//! - **Versions**: the unique `(entity_id, number)` constraint, ordered
//!   listing, atomic version-number allocation
//! - **Fields**: version scoping, name-set filtering, entity-scope
//!   resolution through the version table
//! - **Commits**: find-by-id, absence as `Ok(None)`
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function
//! that creates a fresh, empty store for each test:
//!
//! ```ignore
//! use appforge_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn postgres_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_postgres_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod commit;
mod entity;
mod field;
mod version;

use std::fmt;
use std::future::Future;

use crate::record::{DataType, NewEntity, NewEntityField, NewEntityVersion, VersionNumber};
use crate::DataStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "entity", "version").
    pub category: String,
    /// Test name (e.g. "allocation_starts_at_one").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self {
                category: category.to_string(),
                name: name.to_string(),
                passed: true,
                message: None,
            },
            Err(msg) => Self {
                category: category.to_string(),
                name: name.to_string(),
                passed: false,
                message: Some(msg),
            },
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: DataStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(entity::run_entity_tests(&factory).await);
    results.extend(version::run_version_tests(&factory).await);
    results.extend(field::run_field_tests(&factory).await);
    results.extend(commit::run_commit_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_entity(name: &str) -> NewEntity {
    NewEntity {
        app_id: "test-app".to_string(),
        name: name.to_string(),
        display_name: format!("{name} display"),
        plural_display_name: format!("{name}s"),
        description: None,
        locked_by_user_id: None,
        locked_at: None,
    }
}

fn make_version(entity_id: &str, number: VersionNumber) -> NewEntityVersion {
    NewEntityVersion {
        entity_id: entity_id.to_string(),
        number,
        commit_id: None,
        name: "order".to_string(),
        display_name: "Order".to_string(),
        plural_display_name: "Orders".to_string(),
        description: None,
    }
}

fn make_field(entity_version_id: &str, name: &str) -> NewEntityField {
    NewEntityField {
        entity_version_id: entity_version_id.to_string(),
        permanent_id: None,
        name: name.to_string(),
        display_name: format!("{name} display"),
        data_type: DataType::SingleLineText,
        properties: serde_json::json!({ "maxLength": 42 }),
        required: false,
        searchable: false,
        description: None,
    }
}
