use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::io::{self, Write};
use thiserror::Error;

use crate::config::Config;
use crate::error::{StoreError, ValidationError};
use crate::models::{NewTodo, Priority, Todo, TodoPatch};
use crate::query;
use crate::store::TodoStore;
use crate::transfer::{self, ImportMode};
use crate::utils::{self, Profile};

#[derive(Parser)]
#[command(name = "spicy-todo")]
#[command(about = "Spicy Todo - manage todos in memory or in a SQLite file")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config)
    #[arg(long)]
    pub dev: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List todos (default if no subcommand)
    List {
        /// all, active or completed; anything else lists everything
        #[arg(long, default_value = "all")]
        filter: String,
        /// Case-insensitive text search
        #[arg(long)]
        search: Option<String>,
        /// low, medium or high
        #[arg(long)]
        priority: Option<String>,
    },
    /// Show a single todo
    Show {
        id: String,
    },
    /// Add a new todo
    Add {
        /// Todo text (1-500 characters)
        text: String,
        /// low, medium or high
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Create it already completed
        #[arg(long)]
        completed: bool,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Reminder time on the due date (HH:MM)
        #[arg(long)]
        remind: Option<String>,
    },
    /// Change only the given fields of a todo
    Update {
        id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Reminder time on the due date (HH:MM)
        #[arg(long)]
        remind: Option<String>,
    },
    /// Flip a todo between active and completed
    Toggle {
        id: String,
    },
    /// Delete a todo
    Delete {
        id: String,
    },
    /// Delete every completed todo
    ClearCompleted,
    /// Show totals, completion rate and due-date buckets
    Stats,
    /// Print the number of stored todos
    Count,
    /// List todos whose reminder fires soon
    Reminders {
        /// Look-ahead window in hours (defaults to reminder_window_hours from config)
        #[arg(long)]
        hours: Option<u32>,
    },
    /// Write todos as a JSON export document
    Export {
        /// all, active or completed; anything else exports everything
        #[arg(long, default_value = "all")]
        filter: String,
        /// File to write instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Create todos from a JSON file (an export, a todo array or {"todos": [...]})
    Import {
        path: String,
        /// append or replace (defaults to the file's mode, then append)
        #[arg(long)]
        mode: Option<String>,
    },
    /// Show which storage backend is active
    Info,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::List {
            filter: "all".to_string(),
            search: None,
            priority: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to write output: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to encode JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::Store(StoreError::Validation(err))
    }
}

impl CliError {
    /// Process exit status: 2 for bad input, 4 for a missing todo, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Store(StoreError::Validation(_)) => 2,
            CliError::Store(StoreError::NotFound(_)) => 4,
            _ => 1,
        }
    }

    /// Whether the caller, rather than the environment, caused the failure
    pub fn is_client_error(&self) -> bool {
        self.exit_code() != 1
    }
}

/// Output settings shared by every handler
pub struct Output<'a, W: Write> {
    pub out: &'a mut W,
    pub json: bool,
}

impl<W: Write> Output<'_, W> {
    fn emit_json<T: serde::Serialize>(&mut self, value: &T) -> Result<(), CliError> {
        serde_json::to_writer_pretty(&mut *self.out, value)?;
        writeln!(self.out)?;
        Ok(())
    }

    fn emit_todos(&mut self, todos: &[Todo]) -> Result<(), CliError> {
        if self.json {
            return self.emit_json(&todos);
        }
        if todos.is_empty() {
            writeln!(self.out, "No todos")?;
        }
        for todo in todos {
            writeln!(self.out, "{}", format_todo_line(todo))?;
        }
        Ok(())
    }

    fn emit_todo(&mut self, message: &str, todo: &Todo) -> Result<(), CliError> {
        if self.json {
            return self.emit_json(todo);
        }
        writeln!(self.out, "{} (ID: {})", message, todo.id)?;
        Ok(())
    }
}

/// Dispatch a parsed command against the store
pub fn run<W: Write>(
    command: Commands,
    store: &dyn TodoStore,
    config: &Config,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    match command {
        Commands::List {
            filter,
            search,
            priority,
        } => handle_list(&filter, search.as_deref(), priority.as_deref(), store, output),
        Commands::Show { id } => handle_show(&id, store, output),
        Commands::Add {
            text,
            priority,
            completed,
            due,
            remind,
        } => handle_add(text, &priority, completed, due, remind, store, output),
        Commands::Update {
            id,
            text,
            priority,
            completed,
            due,
            remind,
        } => {
            let patch = TodoPatch {
                text,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                completed,
                due_date: due.as_deref().map(parse_due_date).transpose()?,
                reminder_time: remind.as_deref().map(parse_reminder_time).transpose()?,
            };
            handle_update(&id, patch, store, output)
        }
        Commands::Toggle { id } => handle_toggle(&id, store, output),
        Commands::Delete { id } => handle_delete(&id, store, output),
        Commands::ClearCompleted => handle_clear_completed(store, output),
        Commands::Stats => handle_stats(store, output),
        Commands::Count => handle_count(store, output),
        Commands::Reminders { hours } => {
            handle_reminders(hours.unwrap_or(config.reminder_window_hours), store, output)
        }
        Commands::Export { filter, output: path } => handle_export(&filter, path.as_deref(), store, output),
        Commands::Import { path, mode } => handle_import(&path, mode.as_deref(), store, output),
        Commands::Info => handle_info(config, store, output),
    }
}

/// Handle the list command
pub fn handle_list<W: Write>(
    filter: &str,
    search: Option<&str>,
    priority: Option<&str>,
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let todos = store.list()?;
    let todos = query::filter(&todos, Some(filter), search, priority);
    output.emit_todos(&todos)
}

/// Handle the show command
pub fn handle_show<W: Write>(
    id: &str,
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let todo = store
        .get(id)?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

    if output.json {
        return output.emit_json(&todo);
    }

    let out = &mut output.out;
    writeln!(out, "ID:        {}", todo.id)?;
    writeln!(out, "Text:      {}", todo.text)?;
    writeln!(out, "Priority:  {}", todo.priority)?;
    writeln!(out, "Completed: {}", if todo.completed { "yes" } else { "no" })?;
    if let Some(due) = todo.due_date {
        writeln!(out, "Due:       {}", due.format(utils::DATE_FORMAT))?;
    }
    if let Some(time) = todo.reminder_time {
        writeln!(out, "Reminder:  {}", time.format("%H:%M"))?;
    }
    writeln!(out, "Created:   {}", todo.created_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "Updated:   {}", todo.updated_at.format("%Y-%m-%d %H:%M:%S"))?;
    Ok(())
}

/// Handle the add command
#[allow(clippy::too_many_arguments)]
pub fn handle_add<W: Write>(
    text: String,
    priority: &str,
    completed: bool,
    due: Option<String>,
    remind: Option<String>,
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let new = NewTodo {
        text,
        priority: parse_priority(priority)?,
        completed,
        due_date: due.as_deref().map(parse_due_date).transpose()?,
        reminder_time: remind.as_deref().map(parse_reminder_time).transpose()?,
    };

    let todo = store.create(new)?;
    output.emit_todo("Todo created successfully", &todo)
}

/// Handle the update command
pub fn handle_update<W: Write>(
    id: &str,
    patch: TodoPatch,
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let todo = store.update(id, patch)?;
    output.emit_todo("Todo updated successfully", &todo)
}

/// Handle the toggle command
pub fn handle_toggle<W: Write>(
    id: &str,
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let todo = store.toggle(id)?;
    let message = if todo.completed {
        "Todo marked completed"
    } else {
        "Todo marked active"
    };
    output.emit_todo(message, &todo)
}

/// Handle the delete command. A missing id is reported as not found.
pub fn handle_delete<W: Write>(
    id: &str,
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    if !store.delete(id)? {
        return Err(StoreError::NotFound(id.to_string()).into());
    }

    if output.json {
        return output.emit_json(&json!({ "message": "Todo deleted successfully", "id": id }));
    }
    writeln!(output.out, "Todo deleted successfully (ID: {})", id)?;
    Ok(())
}

/// Handle the clear-completed command
pub fn handle_clear_completed<W: Write>(
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let deleted_count = store.clear_completed()?;
    let message = format!("Cleared {} completed todos", deleted_count);

    if output.json {
        return output.emit_json(&json!({ "message": message, "deleted_count": deleted_count }));
    }
    writeln!(output.out, "{}", message)?;
    Ok(())
}

/// Handle the stats command
pub fn handle_stats<W: Write>(
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let stats = query::stats(&store.list()?);

    if output.json {
        return output.emit_json(&stats);
    }

    let out = &mut output.out;
    writeln!(out, "Total:      {}", stats.total)?;
    writeln!(out, "Active:     {}", stats.active)?;
    writeln!(out, "Completed:  {} ({:.2}%)", stats.completed, stats.completion_rate)?;
    writeln!(
        out,
        "Priority:   high {}, medium {}, low {}",
        stats.priority_breakdown.high, stats.priority_breakdown.medium, stats.priority_breakdown.low
    )?;
    writeln!(out, "Overdue:    {}", stats.overdue)?;
    writeln!(out, "Due today:  {}", stats.due_today)?;
    writeln!(out, "Upcoming:   {}", stats.upcoming)?;
    Ok(())
}

/// Handle the count command
pub fn handle_count<W: Write>(
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let count = store.count()?;
    if output.json {
        return output.emit_json(&json!({ "count": count }));
    }
    writeln!(output.out, "{}", count)?;
    Ok(())
}

/// Handle the reminders command
pub fn handle_reminders<W: Write>(
    hours: u32,
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let todos = store.list()?;
    let due = query::reminders_due_within(&todos, TimeDelta::hours(i64::from(hours)));
    output.emit_todos(&due)
}

/// Handle the export command. The document is always JSON.
pub fn handle_export<W: Write>(
    filter: &str,
    path: Option<&str>,
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let document = transfer::export(store, Some(filter))?;

    let Some(path) = path else {
        return output.emit_json(&document);
    };

    let path = utils::expand_path(path);
    std::fs::write(&path, serde_json::to_string_pretty(&document)?)?;
    if output.json {
        return output.emit_json(&json!({ "count": document.count, "path": path }));
    }
    writeln!(output.out, "Exported {} todos to {}", document.count, path.display())?;
    Ok(())
}

/// Handle the import command
pub fn handle_import<W: Write>(
    path: &str,
    mode: Option<&str>,
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    let contents = std::fs::read_to_string(utils::expand_path(path))?;
    let request = transfer::parse_import(&contents)?;
    let mode = match mode {
        Some(mode) => mode.parse::<ImportMode>()?,
        None => request.mode.unwrap_or_default(),
    };

    let report = transfer::import(store, request.todos, mode)?;
    if output.json {
        return output.emit_json(&report);
    }

    writeln!(
        output.out,
        "Imported {} todos ({} mode), skipped {}",
        report.imported, report.mode, report.skipped
    )?;
    for error in &report.errors {
        writeln!(output.out, "  {}", error)?;
    }
    Ok(())
}

/// Handle the info command
pub fn handle_info<W: Write>(
    config: &Config,
    store: &dyn TodoStore,
    output: &mut Output<'_, W>,
) -> Result<(), CliError> {
    if output.json {
        return output.emit_json(&json!({
            "backend": store.backend_name(),
            "database_url": config.database_url,
        }));
    }

    writeln!(output.out, "Backend: {}", store.backend_name())?;
    match &config.database_url {
        Some(url) => writeln!(output.out, "Database: {}", url)?,
        None => {
            writeln!(output.out, "Database: none (todos are kept in memory for this run)")?;
            if let Some(url) = Config::suggested_database_url(Profile::Prod) {
                writeln!(output.out, "Set database_url = \"{}\" in config.toml to persist them", url)?;
            }
        }
    }
    Ok(())
}

fn parse_priority(value: &str) -> Result<Priority, ValidationError> {
    value.parse()
}

fn parse_due_date(value: &str) -> Result<chrono::NaiveDate, ValidationError> {
    utils::parse_date(value).map_err(|e| {
        ValidationError::new("due_date", format!("invalid date '{}' (expected YYYY-MM-DD): {}", value, e))
    })
}

fn parse_reminder_time(value: &str) -> Result<chrono::NaiveTime, ValidationError> {
    utils::parse_time(value).map_err(|e| {
        ValidationError::new("reminder_time", format!("invalid time '{}' (expected HH:MM): {}", value, e))
    })
}

/// One-line summary used by list-style output
pub fn format_todo_line(todo: &Todo) -> String {
    let mut line = format!(
        "[{}] {}  {:<6}  {}",
        if todo.completed { "x" } else { " " },
        todo.id,
        todo.priority.as_str(),
        todo.text
    );
    match (todo.due_date, todo.reminder_time) {
        (Some(due), Some(time)) => {
            line.push_str(&format!("  (due {} {})", due.format(utils::DATE_FORMAT), time.format("%H:%M")))
        }
        (Some(due), None) => line.push_str(&format!("  (due {})", due.format(utils::DATE_FORMAT))),
        _ => {}
    }
    line
}
