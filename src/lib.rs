pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod query;
pub mod store;
pub mod transfer;
pub mod utils;

pub use config::Config;
pub use error::{StorageError, StoreError, StoreResult, ValidationError};
pub use models::{NewTodo, Priority, Todo, TodoPatch};
pub use query::{PriorityBreakdown, Stats};
pub use store::{open_store, MemoryStore, SqliteStore, TodoStore};
pub use utils::Profile;
