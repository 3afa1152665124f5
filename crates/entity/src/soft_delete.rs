//! Name transform applied when soft-deleting a record.
//!
//! Soft deletion keeps the row for history and audit, so the original name
//! columns must be rewritten to free their values for reuse. The transform
//! is deterministic: the same name and entity id always produce the same
//! rewritten value, which keeps the row traceable back to its entity.

/// Rewrite a name column for a soft-deleted record.
pub fn prepare_deleted_item_name(name: &str, entity_id: &str) -> String {
    format!("{name}__deleted__{entity_id}")
}
