use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{StorageError, StoreError, StoreResult};
use crate::models::{NewTodo, Priority, Todo, TodoPatch};
use crate::store::{seed, TodoStore};
use crate::utils;

const TODO_COLUMNS: &str =
    "id, text, priority, completed, due_date, reminder_time, created_at, updated_at";

/// Relational backend: one row per todo in the `todos` table.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// A private database that disappears with the store
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        Self::initialize_schema(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Create the todos table and its index when absent
    fn initialize_schema(conn: &Connection) -> Result<(), StorageError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS todos (
                id              TEXT PRIMARY KEY,
                text            TEXT NOT NULL,
                priority        TEXT NOT NULL DEFAULT 'medium',
                completed       INTEGER NOT NULL DEFAULT 0,
                due_date        TEXT,
                reminder_time   TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_todos_completed ON todos(completed)",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Map a row selected with `TODO_COLUMNS` to a Todo
    fn row_to_todo(row: &rusqlite::Row) -> Result<Todo, rusqlite::Error> {
        let priority: String = row.get(2)?;
        let due_date: Option<String> = row.get(4)?;
        let reminder_time: Option<String> = row.get(5)?;
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;

        Ok(Todo {
            id: row.get(0)?,
            text: row.get(1)?,
            priority: priority
                .parse::<Priority>()
                .map_err(|e| conversion_error(2, e))?,
            completed: row.get::<_, i64>(3)? != 0,
            due_date: due_date
                .map(|d| utils::parse_date(&d))
                .transpose()
                .map_err(|e| conversion_error(4, e))?,
            reminder_time: reminder_time
                .map(|t| utils::parse_time(&t))
                .transpose()
                .map_err(|e| conversion_error(5, e))?,
            created_at: utils::parse_timestamp(&created_at).map_err(|e| conversion_error(6, e))?,
            updated_at: utils::parse_timestamp(&updated_at).map_err(|e| conversion_error(7, e))?,
        })
    }

    fn insert_todo(conn: &Connection, todo: &Todo) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT INTO todos (id, text, priority, completed, due_date, reminder_time, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                todo.id,
                todo.text,
                todo.priority.as_str(),
                if todo.completed { 1 } else { 0 },
                todo.due_date.map(|d| d.format(utils::DATE_FORMAT).to_string()),
                todo.reminder_time.map(|t| t.format(utils::TIME_FORMAT).to_string()),
                utils::format_timestamp(&todo.created_at),
                utils::format_timestamp(&todo.updated_at)
            ],
        )?;
        Ok(())
    }

    fn fetch_todo(conn: &Connection, id: &str) -> Result<Option<Todo>, rusqlite::Error> {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM todos WHERE id = ?1", TODO_COLUMNS))?;
        stmt.query_row(rusqlite::params![id], Self::row_to_todo)
            .optional()
    }

    fn count_rows(conn: &Connection) -> Result<usize, rusqlite::Error> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM todos", [], |row| row.get(0))?;
        row_count(count)
    }

    /// Seed an empty table. A populated table is detected with a plain read;
    /// only an empty one escalates to an IMMEDIATE transaction, where the count
    /// is repeated so a second process opening the same file cannot seed twice.
    fn seed_if_empty(conn: &mut Connection) -> Result<(), StorageError> {
        if Self::count_rows(conn)? > 0 {
            return Ok(());
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if Self::count_rows(&tx)? == 0 {
            let samples = seed::sample_todos()?;
            for todo in &samples {
                Self::insert_todo(&tx, todo)?;
            }
            tracing::info!(sample_count = samples.len(), "Seeded empty todos table with sample todos");
        }
        tx.commit()?;
        Ok(())
    }

    /// Read, patch and write one row inside a single write transaction. The
    /// patch is built from the row as read inside that transaction.
    fn update_with(
        conn: &mut Connection,
        id: &str,
        make_patch: impl FnOnce(&Todo) -> TodoPatch,
    ) -> StoreResult<Todo> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = Self::fetch_todo(&tx, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let patch = make_patch(&current);
        let updated = current.apply_patch(&patch, utils::today(), utils::now_timestamp())?;

        tx.execute(
            "UPDATE todos SET text = ?1, priority = ?2, completed = ?3, due_date = ?4,
             reminder_time = ?5, updated_at = ?6 WHERE id = ?7",
            rusqlite::params![
                updated.text,
                updated.priority.as_str(),
                if updated.completed { 1 } else { 0 },
                updated.due_date.map(|d| d.format(utils::DATE_FORMAT).to_string()),
                updated.reminder_time.map(|t| t.format(utils::TIME_FORMAT).to_string()),
                utils::format_timestamp(&updated.updated_at),
                id
            ],
        )?;
        tx.commit()?;
        Ok(updated)
    }
}

fn row_count(count: i64) -> Result<usize, rusqlite::Error> {
    usize::try_from(count)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

impl TodoStore for SqliteStore {
    fn list(&self) -> StoreResult<Vec<Todo>> {
        let mut conn = self.lock()?;
        Self::seed_if_empty(&mut conn)?;

        let mut stmt = conn.prepare(&format!("SELECT {} FROM todos ORDER BY rowid ASC", TODO_COLUMNS))?;
        let todos = stmt
            .query_map([], Self::row_to_todo)?
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(total_todos = todos.len(), "Listing todos");
        Ok(todos)
    }

    fn get(&self, id: &str) -> StoreResult<Option<Todo>> {
        let conn = self.lock()?;
        Ok(Self::fetch_todo(&conn, id)?)
    }

    fn create(&self, new: NewTodo) -> StoreResult<Todo> {
        let todo = Todo::create(new, utils::today(), utils::now_timestamp())?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::insert_todo(&tx, &todo)?;
        tx.commit()?;

        tracing::info!(todo_id = %todo.id, priority = %todo.priority, "Todo created");
        Ok(todo)
    }

    fn update(&self, id: &str, patch: TodoPatch) -> StoreResult<Todo> {
        let mut conn = self.lock()?;
        let updated = Self::update_with(&mut conn, id, |_| patch)?;
        tracing::info!(todo_id = %id, "Todo updated");
        Ok(updated)
    }

    fn toggle(&self, id: &str) -> StoreResult<Todo> {
        let mut conn = self.lock()?;
        let updated = Self::update_with(&mut conn, id, |current| TodoPatch::completed(!current.completed))?;
        tracing::info!(todo_id = %id, completed = updated.completed, "Todo toggled");
        Ok(updated)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM todos WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;

        if removed > 0 {
            tracing::info!(todo_id = %id, "Todo deleted");
        }
        Ok(removed > 0)
    }

    fn clear_completed(&self) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let deleted_count = tx.execute("DELETE FROM todos WHERE completed = 1", [])?;
        tx.commit()?;

        tracing::info!(deleted_count, "Cleared completed todos");
        Ok(deleted_count)
    }

    fn count(&self) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        Self::seed_if_empty(&mut conn)?;
        Ok(Self::count_rows(&conn)?)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn priority_is_stored_as_its_string_form() {
        let store = SqliteStore::open_in_memory().unwrap();
        let todo = store
            .create(NewTodo::new("Stored").with_priority(Priority::High))
            .unwrap();

        let conn = store.lock().unwrap();
        let (priority, completed): (String, i64) = conn
            .query_row(
                "SELECT priority, completed FROM todos WHERE id = ?1",
                rusqlite::params![todo.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(priority, "high");
        assert_eq!(completed, 0);
    }

    #[test]
    fn scheduling_fields_round_trip_through_text_columns() {
        let store = SqliteStore::open_in_memory().unwrap();
        let due = utils::today();
        let created = store
            .create(
                NewTodo::new("Dentist")
                    .with_due_date(due)
                    .with_reminder_time(NaiveTime::from_hms_opt(14, 30, 0).unwrap()),
            )
            .unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn undecodable_rows_surface_as_storage_errors() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO todos (id, text, priority, completed, created_at, updated_at)
                 VALUES ('bad', 'Bad row', 'urgent', 0, '2024-01-01 00:00:00', '2024-01-01 00:00:00')",
                [],
            )
            .unwrap();

        let err = store.get("bad").unwrap_err();
        assert!(matches!(err, StoreError::Storage(StorageError::SqliteError(_))));
    }

    #[test]
    fn reads_do_not_wait_on_another_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.db");

        let reader = SqliteStore::open(&path).unwrap();
        let todo = reader.create(NewTodo::new("Already here")).unwrap();

        let writer = Connection::open(&path).unwrap();
        writer.execute_batch("BEGIN IMMEDIATE").unwrap();

        reader.lock().unwrap().busy_timeout(std::time::Duration::ZERO).unwrap();
        assert_eq!(reader.list().unwrap(), vec![todo]);
        assert_eq!(reader.count().unwrap(), 1);

        writer.execute_batch("ROLLBACK").unwrap();
    }

    #[test]
    fn negative_row_counts_are_rejected() {
        assert_eq!(row_count(3).unwrap(), 3);
        assert!(matches!(
            row_count(-1),
            Err(rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, _))
        ));
    }

    #[test]
    fn failed_update_leaves_row_untouched() {
        let store = SqliteStore::open_in_memory().unwrap();
        let todo = store.create(NewTodo::new("Unchanged")).unwrap();

        let bad = TodoPatch {
            text: Some(String::new()),
            completed: Some(true),
            ..TodoPatch::default()
        };
        assert!(matches!(store.update(&todo.id, bad), Err(StoreError::Validation(_))));
        assert_eq!(store.get(&todo.id).unwrap().unwrap(), todo);
    }
}
