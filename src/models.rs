use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::utils;

/// Longest accepted todo text, in characters
pub const MAX_TEXT_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(ValidationError::new(
                "priority",
                format!("'{}' is not one of low, medium, high", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub priority: Priority,
    pub completed: bool,
    /// Local calendar date
    pub due_date: Option<NaiveDate>,
    /// Local time of day on `due_date`
    pub reminder_time: Option<NaiveTime>,
    /// UTC wall clock at creation. Due dates and reminders are local-calendar
    /// values and are never compared against this.
    pub created_at: NaiveDateTime,
    /// UTC, strictly increasing across writes to the same todo
    pub updated_at: NaiveDateTime,
}

/// Caller-supplied fields for a new todo. Id and timestamps are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    pub text: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub reminder_time: Option<NaiveTime>,
}

/// Partial update. `None` means "leave unchanged"; there is no way to clear
/// an optional field through a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_time: Option<NaiveTime>,
}

impl NewTodo {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_reminder_time(mut self, reminder_time: NaiveTime) -> Self {
        self.reminder_time = Some(reminder_time);
        self
    }

    /// Check every field constraint against `today`
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        validate_text(&self.text)?;
        if let Some(due_date) = self.due_date {
            validate_due_date(due_date, today)?;
        }
        validate_reminder(self.due_date, self.reminder_time)
    }
}

impl TodoPatch {
    /// A patch that only sets the completion flag
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }
}

impl Todo {
    /// Validate `new` and build the record the store will persist
    pub fn create(new: NewTodo, today: NaiveDate, now: NaiveDateTime) -> Result<Self, ValidationError> {
        new.validate(today)?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            text: new.text,
            priority: new.priority,
            completed: new.completed,
            due_date: new.due_date,
            reminder_time: new.reminder_time,
            created_at: now,
            updated_at: now,
        })
    }

    /// Produce the patched record without touching `self`.
    ///
    /// The due date is checked against `today` only when the patch sets it, so
    /// a todo that has become overdue can still be toggled or renamed.
    pub fn apply_patch(
        &self,
        patch: &TodoPatch,
        today: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let mut updated = self.clone();
        if let Some(text) = &patch.text {
            updated.text = text.clone();
        }
        if let Some(priority) = patch.priority {
            updated.priority = priority;
        }
        if let Some(completed) = patch.completed {
            updated.completed = completed;
        }
        if let Some(due_date) = patch.due_date {
            validate_due_date(due_date, today)?;
            updated.due_date = Some(due_date);
        }
        if let Some(reminder_time) = patch.reminder_time {
            updated.reminder_time = Some(reminder_time);
        }

        validate_text(&updated.text)?;
        validate_reminder(updated.due_date, updated.reminder_time)?;

        updated.updated_at = utils::next_timestamp(self.updated_at, now);
        Ok(updated)
    }

    /// Due date and reminder combined into one local datetime, when both are set
    pub fn reminder_at(&self) -> Option<NaiveDateTime> {
        match (self.due_date, self.reminder_time) {
            (Some(date), Some(time)) => Some(date.and_time(time)),
            _ => None,
        }
    }
}

pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("text", "must not be empty"));
    }
    let len = text.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(ValidationError::new(
            "text",
            format!("must be at most {} characters (got {})", MAX_TEXT_LEN, len),
        ));
    }
    Ok(())
}

pub fn validate_due_date(due_date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if due_date < today {
        return Err(ValidationError::new(
            "due_date",
            format!("{} is in the past", due_date.format(utils::DATE_FORMAT)),
        ));
    }
    Ok(())
}

pub fn validate_reminder(
    due_date: Option<NaiveDate>,
    reminder_time: Option<NaiveTime>,
) -> Result<(), ValidationError> {
    if reminder_time.is_some() && due_date.is_none() {
        return Err(ValidationError::new(
            "reminder_time",
            "requires a due_date",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn now() -> NaiveDateTime {
        today().and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn priority_parses_and_prints_lowercase() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(Priority::Low.to_string(), "low");
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(serde_json::to_string(&Priority::Medium).unwrap(), "\"medium\"");

        let err = "urgent".parse::<Priority>().unwrap_err();
        assert_eq!(err.field, "priority");
        assert!("HIGH".parse::<Priority>().is_err());
    }

    #[test]
    fn create_applies_defaults_and_stamps_both_timestamps() {
        let todo = Todo::create(NewTodo::new("Buy milk"), today(), now()).unwrap();
        assert!(!todo.id.is_empty());
        assert_eq!(todo.priority, Priority::Medium);
        assert!(!todo.completed);
        assert_eq!(todo.due_date, None);
        assert_eq!(todo.created_at, now());
        assert_eq!(todo.created_at, todo.updated_at);
    }

    #[test]
    fn text_length_is_bounded() {
        assert!(validate_text("x").is_ok());
        assert!(validate_text(&"é".repeat(MAX_TEXT_LEN)).is_ok());
        assert_eq!(validate_text("").unwrap_err().field, "text");
        assert_eq!(validate_text("   ").unwrap_err().field, "text");
        assert!(validate_text(&"a".repeat(MAX_TEXT_LEN + 1)).is_err());
    }

    #[test]
    fn due_date_may_be_today_but_not_yesterday() {
        let ok = NewTodo::new("Pay rent").with_due_date(today());
        assert!(ok.validate(today()).is_ok());

        let past = NewTodo::new("Pay rent").with_due_date(today() - TimeDelta::days(1));
        assert_eq!(past.validate(today()).unwrap_err().field, "due_date");
    }

    #[test]
    fn reminder_without_due_date_is_rejected() {
        let new = NewTodo::new("Call mum").with_reminder_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        let err = Todo::create(new, today(), now()).unwrap_err();
        assert_eq!(err.field, "reminder_time");
    }

    #[test]
    fn patch_leaves_absent_fields_alone() {
        let original = Todo::create(
            NewTodo::new("Water plants")
                .with_priority(Priority::High)
                .with_due_date(today())
                .with_reminder_time(NaiveTime::from_hms_opt(18, 30, 0).unwrap()),
            today(),
            now(),
        )
        .unwrap();

        let later = now() + TimeDelta::minutes(5);
        let patched = original
            .apply_patch(&TodoPatch::completed(true), today(), later)
            .unwrap();

        assert!(patched.completed);
        assert_eq!(patched.id, original.id);
        assert_eq!(patched.text, original.text);
        assert_eq!(patched.priority, original.priority);
        assert_eq!(patched.due_date, original.due_date);
        assert_eq!(patched.reminder_time, original.reminder_time);
        assert_eq!(patched.created_at, original.created_at);
        assert_eq!(patched.updated_at, later);
    }

    #[test]
    fn patch_bumps_updated_at_even_when_clock_stalls() {
        let original = Todo::create(NewTodo::new("Stall"), today(), now()).unwrap();
        let patched = original
            .apply_patch(&TodoPatch::completed(true), today(), now())
            .unwrap();
        assert!(patched.updated_at > original.updated_at);
    }

    #[test]
    fn overdue_todo_can_still_be_patched() {
        let mut original = Todo::create(NewTodo::new("Old"), today(), now()).unwrap();
        original.due_date = Some(today() - TimeDelta::days(3));

        let patched = original
            .apply_patch(&TodoPatch::completed(true), today(), now())
            .unwrap();
        assert!(patched.completed);

        let moved = TodoPatch {
            due_date: Some(today() - TimeDelta::days(1)),
            ..TodoPatch::default()
        };
        assert_eq!(
            original.apply_patch(&moved, today(), now()).unwrap_err().field,
            "due_date"
        );
    }

    #[test]
    fn patch_rejects_blank_text_and_orphan_reminder() {
        let original = Todo::create(NewTodo::new("Keep"), today(), now()).unwrap();

        let blank = TodoPatch {
            text: Some(String::new()),
            ..TodoPatch::default()
        };
        assert_eq!(original.apply_patch(&blank, today(), now()).unwrap_err().field, "text");

        let orphan = TodoPatch {
            reminder_time: NaiveTime::from_hms_opt(8, 0, 0),
            ..TodoPatch::default()
        };
        assert_eq!(
            original.apply_patch(&orphan, today(), now()).unwrap_err().field,
            "reminder_time"
        );
    }

    #[test]
    fn patch_deserializes_only_present_fields() {
        let patch: TodoPatch = serde_json::from_str(r#"{"completed":true}"#).unwrap();
        assert_eq!(patch, TodoPatch::completed(true));
        assert_eq!(patch.text, None);
    }
}
