//! Custody of the todo collection.
//!
//! `TodoStore` is the single capability set the rest of the crate depends on.
//! Two backends implement it with identical observable behavior:
//! [`MemoryStore`] keeps records for the life of the process and
//! [`SqliteStore`] keeps them in a `todos` table on disk. Which one runs is
//! decided once, from the configured connection string, by [`open_store`].
//!
//! Reads that observe an empty collection (`list`, `count`) first populate it
//! with the sample dataset in [`seed`]. That is a convenience for a fresh
//! environment; the check and the insert happen under the backend's lock.

pub mod memory;
pub mod seed;
pub mod sqlite;

use std::path::PathBuf;

use crate::error::{StorageError, StoreResult};
use crate::models::{NewTodo, Todo, TodoPatch};
use crate::utils;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub trait TodoStore: Send + Sync {
    /// Every stored todo as independent copies. Seeds an empty store first.
    fn list(&self) -> StoreResult<Vec<Todo>>;

    fn get(&self, id: &str) -> StoreResult<Option<Todo>>;

    /// Validate, assign id and timestamps, persist, and return the stored copy
    fn create(&self, new: NewTodo) -> StoreResult<Todo>;

    /// Apply only the fields present in `patch`. Fails with `NotFound` for an
    /// unknown id and with `Validation` if the result breaks a constraint.
    fn update(&self, id: &str, patch: TodoPatch) -> StoreResult<Todo>;

    /// Returns whether a record was removed
    fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Remove every completed todo, returning how many went
    fn clear_completed(&self) -> StoreResult<usize>;

    /// Number of stored todos. Seeds an empty store first.
    fn count(&self) -> StoreResult<usize>;

    /// Flip `completed`; same as an update carrying only that field. The read
    /// and the write happen under one lock, so concurrent toggles never collapse.
    fn toggle(&self, id: &str) -> StoreResult<Todo>;

    fn backend_name(&self) -> &'static str;
}

/// Where the configured connection string points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Memory,
    SqliteMemory,
    SqliteFile(PathBuf),
}

/// Interpret a connection string. Absent or blank selects the in-memory backend.
///
/// Accepted forms: `sqlite://<path>`, `sqlite:<path>`, `sqlite::memory:`,
/// `:memory:` and a bare file path.
pub fn parse_database_url(url: Option<&str>) -> Result<Backend, StorageError> {
    let url = match url.map(str::trim) {
        None | Some("") => return Ok(Backend::Memory),
        Some(url) => url,
    };

    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
        rest
    } else if url.contains("://") {
        return Err(StorageError::UnsupportedUrl(url.to_string()));
    } else {
        url
    };

    match path {
        "" => Err(StorageError::UnsupportedUrl(url.to_string())),
        ":memory:" => Ok(Backend::SqliteMemory),
        path => Ok(Backend::SqliteFile(utils::expand_path(path))),
    }
}

/// Open the backend selected by `database_url`. Called once at startup.
pub fn open_store(database_url: Option<&str>) -> StoreResult<Box<dyn TodoStore>> {
    let store: Box<dyn TodoStore> = match parse_database_url(database_url)? {
        Backend::Memory => Box::new(MemoryStore::new()),
        Backend::SqliteMemory => Box::new(SqliteStore::open_in_memory()?),
        Backend::SqliteFile(path) => Box::new(SqliteStore::open(&path)?),
    };
    tracing::info!(backend = store.backend_name(), "Todo store opened");
    Ok(store)
}
