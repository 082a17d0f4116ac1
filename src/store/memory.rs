use std::sync::{Mutex, MutexGuard};

use crate::error::{StorageError, StoreError, StoreResult};
use crate::models::{NewTodo, Todo, TodoPatch};
use crate::store::{seed, TodoStore};
use crate::utils;

/// Process-lifetime backend. Records live in insertion order behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    todos: Mutex<Vec<Todo>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Todo>>, StorageError> {
        self.todos.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Must be called with the lock held so two first readers cannot both seed
    fn seed_if_empty(todos: &mut Vec<Todo>) -> Result<(), StorageError> {
        if todos.is_empty() {
            todos.extend(seed::sample_todos()?);
            tracing::info!(sample_count = todos.len(), "Seeded empty memory store with sample todos");
        }
        Ok(())
    }

    /// Patch one record in place; the patch is built from the record as it
    /// stands under the same lock.
    fn update_with(
        todos: &mut [Todo],
        id: &str,
        make_patch: impl FnOnce(&Todo) -> TodoPatch,
    ) -> StoreResult<Todo> {
        let slot = todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let patch = make_patch(&*slot);
        let updated = slot.apply_patch(&patch, utils::today(), utils::now_timestamp())?;
        *slot = updated.clone();
        Ok(updated)
    }
}

impl TodoStore for MemoryStore {
    fn list(&self) -> StoreResult<Vec<Todo>> {
        let mut todos = self.lock()?;
        Self::seed_if_empty(&mut todos)?;
        tracing::debug!(total_todos = todos.len(), "Listing todos");
        Ok(todos.clone())
    }

    fn get(&self, id: &str) -> StoreResult<Option<Todo>> {
        let todos = self.lock()?;
        Ok(todos.iter().find(|todo| todo.id == id).cloned())
    }

    fn create(&self, new: NewTodo) -> StoreResult<Todo> {
        let todo = Todo::create(new, utils::today(), utils::now_timestamp())?;
        let mut todos = self.lock()?;
        todos.push(todo.clone());
        tracing::info!(
            todo_id = %todo.id,
            priority = %todo.priority,
            total_todos = todos.len(),
            "Todo created"
        );
        Ok(todo)
    }

    fn update(&self, id: &str, patch: TodoPatch) -> StoreResult<Todo> {
        let mut todos = self.lock()?;
        let updated = Self::update_with(&mut todos, id, |_| patch)?;
        tracing::info!(todo_id = %id, "Todo updated");
        Ok(updated)
    }

    fn toggle(&self, id: &str) -> StoreResult<Todo> {
        let mut todos = self.lock()?;
        let updated = Self::update_with(&mut todos, id, |current| TodoPatch::completed(!current.completed))?;
        tracing::info!(todo_id = %id, completed = updated.completed, "Todo toggled");
        Ok(updated)
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut todos = self.lock()?;
        let before = todos.len();
        todos.retain(|todo| todo.id != id);
        let removed = todos.len() < before;
        if removed {
            tracing::info!(todo_id = %id, total_todos = todos.len(), "Todo deleted");
        }
        Ok(removed)
    }

    fn clear_completed(&self) -> StoreResult<usize> {
        let mut todos = self.lock()?;
        let before = todos.len();
        todos.retain(|todo| !todo.completed);
        let deleted_count = before - todos.len();
        tracing::info!(deleted_count, total_todos = todos.len(), "Cleared completed todos");
        Ok(deleted_count)
    }

    fn count(&self) -> StoreResult<usize> {
        let mut todos = self.lock()?;
        Self::seed_if_empty(&mut todos)?;
        Ok(todos.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
