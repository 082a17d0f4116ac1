//! Sample dataset written into a store the first time it is seen empty.

use uuid::Uuid;

use crate::error::StorageError;
use crate::models::{Priority, Todo};
use crate::utils;

struct Sample {
    text: &'static str,
    priority: Priority,
    completed: bool,
    created_at: &'static str,
    updated_at: &'static str,
}

const SAMPLES: [Sample; 8] = [
    Sample {
        text: "Learn React hooks and state management",
        priority: Priority::High,
        completed: false,
        created_at: "2024-01-15 10:00:00",
        updated_at: "2024-01-15 10:00:00",
    },
    Sample {
        text: "Build a spicy todo application",
        priority: Priority::High,
        completed: true,
        created_at: "2024-01-14 09:30:00",
        updated_at: "2024-01-15 11:45:00",
    },
    Sample {
        text: "Add beautiful animations and transitions",
        priority: Priority::Medium,
        completed: false,
        created_at: "2024-01-13 14:20:00",
        updated_at: "2024-01-13 14:20:00",
    },
    Sample {
        text: "Implement dark mode toggle",
        priority: Priority::Low,
        completed: false,
        created_at: "2024-01-12 16:45:00",
        updated_at: "2024-01-12 16:45:00",
    },
    Sample {
        text: "Write comprehensive tests",
        priority: Priority::Medium,
        completed: false,
        created_at: "2024-01-11 11:15:00",
        updated_at: "2024-01-11 11:15:00",
    },
    Sample {
        text: "Deploy to production",
        priority: Priority::High,
        completed: true,
        created_at: "2024-01-10 08:00:00",
        updated_at: "2024-01-14 15:30:00",
    },
    Sample {
        text: "Optimize performance and bundle size",
        priority: Priority::Medium,
        completed: false,
        created_at: "2024-01-09 13:30:00",
        updated_at: "2024-01-09 13:30:00",
    },
    Sample {
        text: "Add keyboard shortcuts for power users",
        priority: Priority::Low,
        completed: false,
        created_at: "2024-01-08 10:45:00",
        updated_at: "2024-01-08 10:45:00",
    },
];

/// Fresh copies of the sample todos, each with a new id.
/// These are trusted constants and skip field validation.
pub fn sample_todos() -> Result<Vec<Todo>, StorageError> {
    SAMPLES
        .iter()
        .map(|sample| -> Result<Todo, StorageError> {
            Ok(Todo {
                id: Uuid::new_v4().to_string(),
                text: sample.text.to_string(),
                priority: sample.priority,
                completed: sample.completed,
                due_date: None,
                reminder_time: None,
                created_at: utils::parse_timestamp(sample.created_at)?,
                updated_at: utils::parse_timestamp(sample.updated_at)?,
            })
        })
        .collect()
}
