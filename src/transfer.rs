//! Moving todos in and out of a store as JSON.
//!
//! An export is a snapshot of the store, optionally narrowed by completion
//! state, wrapped with a count and a UTC timestamp. An import feeds each entry
//! through the normal `create` path, so every row is validated exactly like a
//! new todo. Rows that fail validation are skipped and reported by position;
//! any other failure aborts the import.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult, ValidationError};
use crate::models::{NewTodo, Todo};
use crate::query;
use crate::store::TodoStore;
use crate::utils;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub data: Vec<Todo>,
    pub format: String,
    pub count: usize,
    /// UTC
    pub exported_at: NaiveDateTime,
    pub filter: String,
}

/// Snapshot the store, keeping only todos matching the completion `filter`.
/// Unknown filter values export everything, as `list` does.
pub fn export(store: &dyn TodoStore, filter: Option<&str>) -> StoreResult<ExportDocument> {
    let todos = store.list()?;
    let data = query::filter(&todos, filter, None, None);
    tracing::info!(exported_count = data.len(), "Exported todos");

    Ok(ExportDocument {
        count: data.len(),
        data,
        format: "json".to_string(),
        exported_at: utils::now_timestamp(),
        filter: filter.unwrap_or("all").to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Add the imported todos next to the existing ones
    #[default]
    Append,
    /// Delete every existing todo first
    Replace,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Append => "append",
            ImportMode::Replace => "replace",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "append" => Ok(ImportMode::Append),
            "replace" => Ok(ImportMode::Replace),
            other => Err(ValidationError::new(
                "mode",
                format!("'{}' is not one of append, replace", other),
            )),
        }
    }
}

/// What an import file may contain: a request object, a previous export, or
/// a bare array. Entries only need `text`; extra fields such as `id` or
/// timestamps are ignored.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Request {
        todos: Vec<NewTodo>,
        #[serde(default)]
        mode: Option<ImportMode>,
    },
    Export {
        data: Vec<NewTodo>,
    },
    List(Vec<NewTodo>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub todos: Vec<NewTodo>,
    /// Mode named inside the file, if any
    pub mode: Option<ImportMode>,
}

pub fn parse_import(json: &str) -> Result<ImportRequest, ValidationError> {
    let file: ImportFile = serde_json::from_str(json).map_err(|e| {
        ValidationError::new(
            "todos",
            format!("expected a todo array, an export or {{\"todos\": [...]}}: {}", e),
        )
    })?;

    Ok(match file {
        ImportFile::Request { todos, mode } => ImportRequest { todos, mode },
        ImportFile::Export { data } => ImportRequest { todos: data, mode: None },
        ImportFile::List(todos) => ImportRequest { todos, mode: None },
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub mode: ImportMode,
    pub imported: usize,
    pub skipped: usize,
    /// One message per skipped row, numbered from 1
    pub errors: Vec<String>,
}

/// Create each entry in order. In replace mode the existing todos are deleted
/// first, even if every entry then turns out to be invalid.
pub fn import(store: &dyn TodoStore, todos: Vec<NewTodo>, mode: ImportMode) -> StoreResult<ImportReport> {
    let mut report = ImportReport {
        mode,
        ..ImportReport::default()
    };

    if mode == ImportMode::Replace {
        let existing = store.list()?;
        for todo in &existing {
            store.delete(&todo.id)?;
        }
        tracing::info!(deleted_count = existing.len(), "Cleared store before import");
    }

    for (index, new) in todos.into_iter().enumerate() {
        match store.create(new) {
            Ok(_) => report.imported += 1,
            Err(StoreError::Validation(err)) => {
                report.skipped += 1;
                report.errors.push(format!("Row {}: {}", index + 1, err));
            }
            Err(other) => return Err(other),
        }
    }

    tracing::info!(
        mode = %mode,
        imported = report.imported,
        skipped = report.skipped,
        "Imported todos"
    );
    Ok(report)
}
