//! Application state for the API server.

use std::sync::Arc;

use incognibro_storage::{Database, StorageError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Settings database.
    pub db: Arc<Database>,
}

impl AppState {
    /// Creates a new application state with the given database.
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Creates application state with a fresh in-memory database.
    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self::new(Database::in_memory()?))
    }
}
