/// All errors that can be returned by a DataStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No record with the given id exists in the table.
    #[error("record not found in {table}: {id}")]
    RecordNotFound { table: &'static str, id: String },

    /// A uniqueness constraint was violated (e.g. a second version row with
    /// the same (entity_id, number) pair).
    #[error("duplicate record in {table}: {detail}")]
    DuplicateRecord { table: &'static str, detail: String },

    /// A backend-specific storage error (DB connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(table: &'static str, id: impl Into<String>) -> Self {
        Self::RecordNotFound {
            table,
            id: id.into(),
        }
    }

    pub fn duplicate(table: &'static str, detail: impl Into<String>) -> Self {
        Self::DuplicateRecord {
            table,
            detail: detail.into(),
        }
    }
}
