//! Filter, sort, pagination, and update-payload types for [`DataStore`]
//! operations.
//!
//! Every filter is `Default`-constructible so callers state only the columns
//! they actually filter on. Update payloads distinguish non-nullable columns
//! (`Option<T>`: `None` leaves the column untouched) from nullable columns
//! ([`Patch<T>`]: keep, set, or clear).
//!
//! [`DataStore`]: crate::DataStore

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::record::{DataType, VersionNumber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Update instruction for a nullable column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    /// Leave the column as it is.
    Keep,
    /// Set the column to the given value.
    Set(T),
    /// Null the column out.
    Clear,
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    /// Apply this patch to a column slot.
    pub fn apply(self, slot: &mut Option<T>) {
        match self {
            Patch::Keep => {}
            Patch::Set(value) => *slot = Some(value),
            Patch::Clear => *slot = None,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }
}

// ── Entities ─────────────────────────────────────────────────────────────────

/// Filter over entity head records.
///
/// All present fields must match (logical AND). `include_deleted` defaults
/// to `false`: soft-deleted rows are invisible unless explicitly requested.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    pub id: Option<String>,
    pub app_id: Option<String>,
    pub name: Option<String>,
    pub include_deleted: bool,
}

impl EntityFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOrderBy {
    Name(SortOrder),
    CreatedAt(SortOrder),
}

#[derive(Debug, Clone, Default)]
pub struct EntityListArgs {
    pub filter: EntityFilter,
    pub order_by: Option<EntityOrderBy>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

/// Update payload for an entity head record.
#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub plural_display_name: Option<String>,
    pub description: Patch<String>,
    pub locked_by_user_id: Patch<String>,
    pub locked_at: Patch<String>,
    pub deleted_at: Patch<String>,
}

// ── Versions ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct VersionFilter {
    pub id: Option<String>,
    pub entity_id: Option<String>,
    pub number: Option<VersionNumber>,
    pub commit_id: Option<String>,
}

impl VersionFilter {
    /// The draft row of the given entity.
    pub fn draft_of(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            number: Some(VersionNumber::Draft),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionOrderBy {
    Number(SortOrder),
}

#[derive(Debug, Clone, Default)]
pub struct VersionListArgs {
    pub filter: VersionFilter,
    pub order_by: Option<VersionOrderBy>,
    pub take: Option<usize>,
}

/// Update payload for a version row. Only the draft row is ever patched.
#[derive(Debug, Clone, Default)]
pub struct VersionPatch {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub plural_display_name: Option<String>,
    pub description: Patch<String>,
    pub deleted: Option<bool>,
    pub commit_id: Patch<String>,
}

// ── Fields ───────────────────────────────────────────────────────────────────

/// Scope a field query to one version of one entity without knowing the
/// version row's id. The store resolves the pair through the version table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionScope {
    pub entity_id: String,
    pub number: VersionNumber,
}

#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    pub entity_version_id: Option<String>,
    pub entity_scope: Option<VersionScope>,
    /// Restrict to fields whose name is in the set.
    pub name_in: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldListArgs {
    pub filter: FieldFilter,
    pub take: Option<usize>,
}

/// Update payload for an entity field.
#[derive(Debug, Clone, Default)]
pub struct FieldPatch {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub data_type: Option<DataType>,
    pub properties: Option<serde_json::Value>,
    pub required: Option<bool>,
    pub searchable: Option<bool>,
    pub description: Patch<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_keep_leaves_slot_alone() {
        let mut slot = Some("held".to_string());
        Patch::Keep.apply(&mut slot);
        assert_eq!(slot.as_deref(), Some("held"));
    }

    #[test]
    fn patch_set_overwrites_slot() {
        let mut slot: Option<String> = None;
        Patch::Set("value".to_string()).apply(&mut slot);
        assert_eq!(slot.as_deref(), Some("value"));
    }

    #[test]
    fn patch_clear_nulls_slot() {
        let mut slot = Some("held".to_string());
        Patch::<String>::Clear.apply(&mut slot);
        assert_eq!(slot, None);
    }

    #[test]
    fn entity_filter_defaults_exclude_deleted() {
        let filter = EntityFilter::default();
        assert!(!filter.include_deleted);
        assert!(filter.id.is_none());
    }

    #[test]
    fn draft_of_targets_version_zero() {
        let filter = VersionFilter::draft_of("ent-1");
        assert_eq!(filter.entity_id.as_deref(), Some("ent-1"));
        assert_eq!(filter.number, Some(VersionNumber::Draft));
    }
}
