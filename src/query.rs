//! Filtered views and aggregate statistics over a snapshot from the store.
//! Nothing here mutates its input or holds state between calls.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::models::{Priority, Todo};
use crate::utils;

/// Todos due within this many days after today count as upcoming
pub const UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl CompletionFilter {
    /// Only the exact tokens `active` and `completed` filter anything.
    /// Every other value, recognised or not, means no filtering.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("active") => CompletionFilter::Active,
            Some("completed") => CompletionFilter::Completed,
            _ => CompletionFilter::All,
        }
    }

    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            CompletionFilter::All => true,
            CompletionFilter::Active => !todo.completed,
            CompletionFilter::Completed => todo.completed,
        }
    }
}

/// Keep the todos matching every supplied criterion.
///
/// `search` is a case-insensitive substring match on the text; `priority` is
/// an exact match on the priority's string form. Empty strings are ignored.
pub fn filter(
    todos: &[Todo],
    completion: Option<&str>,
    search: Option<&str>,
    priority: Option<&str>,
) -> Vec<Todo> {
    let completion = CompletionFilter::parse(completion);
    let search = search.filter(|s| !s.is_empty()).map(str::to_lowercase);
    let priority = priority.filter(|p| !p.is_empty());

    todos
        .iter()
        .filter(|todo| completion.matches(todo))
        .filter(|todo| match &search {
            Some(needle) => todo.text.to_lowercase().contains(needle.as_str()),
            None => true,
        })
        .filter(|todo| match priority {
            Some(p) => todo.priority.as_str() == p,
            None => true,
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    /// Percentage, rounded to two decimals; 0 for an empty input
    pub completion_rate: f64,
    pub priority_breakdown: PriorityBreakdown,
    pub overdue: usize,
    pub due_today: usize,
    pub upcoming: usize,
}

/// Aggregate counts, with due dates judged against the local calendar
pub fn stats(todos: &[Todo]) -> Stats {
    stats_on(todos, utils::today())
}

pub fn stats_on(todos: &[Todo], today: NaiveDate) -> Stats {
    let total = todos.len();
    let completed = todos.iter().filter(|t| t.completed).count();

    let mut priority_breakdown = PriorityBreakdown::default();
    for todo in todos {
        match todo.priority {
            Priority::High => priority_breakdown.high += 1,
            Priority::Medium => priority_breakdown.medium += 1,
            Priority::Low => priority_breakdown.low += 1,
        }
    }

    let horizon = today + TimeDelta::days(UPCOMING_WINDOW_DAYS);
    let (mut overdue, mut due_today, mut upcoming) = (0, 0, 0);
    for due in todos
        .iter()
        .filter(|t| !t.completed)
        .filter_map(|t| t.due_date)
    {
        if due < today {
            overdue += 1;
        } else if due == today {
            due_today += 1;
        } else if due <= horizon {
            upcoming += 1;
        }
    }

    let completion_rate = if total > 0 {
        round2(completed as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    Stats {
        total,
        active: total - completed,
        completed,
        completion_rate,
        priority_breakdown,
        overdue,
        due_today,
        upcoming,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Incomplete todos whose due date plus reminder time falls within
/// `[now, now + window]` on the local clock
pub fn reminders_due_within(todos: &[Todo], window: TimeDelta) -> Vec<Todo> {
    reminders_due_between(todos, utils::local_now(), window)
}

/// A window reaching past the last representable datetime is clamped to it.
pub fn reminders_due_between(todos: &[Todo], now: NaiveDateTime, window: TimeDelta) -> Vec<Todo> {
    let until = now.checked_add_signed(window).unwrap_or(NaiveDateTime::MAX);
    todos
        .iter()
        .filter(|todo| !todo.completed)
        .filter(|todo| match todo.reminder_at() {
            Some(at) => at >= now && at <= until,
            None => false,
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn todo(text: &str, priority: Priority, completed: bool) -> Todo {
        let ts = today().and_hms_opt(8, 0, 0).unwrap();
        Todo {
            id: format!("id-{}", text),
            text: text.to_string(),
            priority,
            completed,
            due_date: None,
            reminder_time: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn due(mut todo: Todo, days_from_today: i64) -> Todo {
        todo.due_date = Some(today() + TimeDelta::days(days_from_today));
        todo
    }

    fn sample() -> Vec<Todo> {
        vec![
            todo("Buy milk", Priority::High, false),
            todo("Walk the dog", Priority::Medium, true),
            todo("Read MILK label", Priority::Low, false),
            todo("File taxes", Priority::High, true),
        ]
    }

    #[test]
    fn completion_filter_only_knows_two_tokens() {
        assert_eq!(CompletionFilter::parse(Some("active")), CompletionFilter::Active);
        assert_eq!(CompletionFilter::parse(Some("completed")), CompletionFilter::Completed);
        assert_eq!(CompletionFilter::parse(Some("all")), CompletionFilter::All);
        assert_eq!(CompletionFilter::parse(Some("Active")), CompletionFilter::All);
        assert_eq!(CompletionFilter::parse(None), CompletionFilter::All);
    }

    #[test]
    fn active_filter_keeps_exactly_incomplete() {
        let todos = sample();
        let active = filter(&todos, Some("active"), None, None);
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|t| !t.completed));

        let done = filter(&todos, Some("completed"), None, None);
        assert_eq!(done.len(), 2);
        assert!(done.iter().all(|t| t.completed));
    }

    #[test]
    fn unknown_filter_returns_input_unchanged() {
        let todos = sample();
        assert_eq!(filter(&todos, Some("bogus"), None, None), todos);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let todos = sample();
        let found = filter(&todos, None, Some("milk"), None);
        let texts: Vec<_> = found.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Buy milk", "Read MILK label"]);
        assert_eq!(filter(&todos, None, Some(""), None).len(), todos.len());
    }

    #[test]
    fn priority_is_exact_and_filters_compose() {
        let todos = sample();
        assert_eq!(filter(&todos, None, None, Some("high")).len(), 2);
        assert!(filter(&todos, None, None, Some("HIGH")).is_empty());

        let combined = filter(&todos, Some("active"), Some("milk"), Some("high"));
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].text, "Buy milk");
    }

    #[test]
    fn empty_stats_do_not_divide_by_zero() {
        let s = stats_on(&[], today());
        assert_eq!(s.total, 0);
        assert_eq!(s.active + s.completed, s.total);
        assert_eq!(s.completion_rate, 0.0);
        assert_eq!(s.priority_breakdown, PriorityBreakdown::default());
    }

    #[test]
    fn stats_scenario_four_todos() {
        let todos = vec![
            todo("a", Priority::High, true),
            todo("b", Priority::High, false),
            todo("c", Priority::Medium, false),
            todo("d", Priority::Low, false),
        ];
        let s = stats_on(&todos, today());
        assert_eq!(s.total, 4);
        assert_eq!(s.completed, 1);
        assert_eq!(s.active, 3);
        assert_eq!(s.completion_rate, 25.0);
        assert_eq!(
            s.priority_breakdown,
            PriorityBreakdown { high: 2, medium: 1, low: 1 }
        );
    }

    #[test]
    fn completion_rate_rounds_to_two_decimals() {
        let todos = vec![
            todo("a", Priority::Low, true),
            todo("b", Priority::Low, false),
            todo("c", Priority::Low, false),
        ];
        assert_eq!(stats_on(&todos, today()).completion_rate, 33.33);
    }

    #[test]
    fn due_buckets_ignore_completed_todos() {
        let todos = vec![
            due(todo("late", Priority::Low, false), -1),
            due(todo("late but done", Priority::Low, true), -2),
            due(todo("today", Priority::Low, false), 0),
            due(todo("soon", Priority::Low, false), 1),
            due(todo("edge", Priority::Low, false), UPCOMING_WINDOW_DAYS),
            due(todo("far", Priority::Low, false), UPCOMING_WINDOW_DAYS + 1),
            todo("undated", Priority::Low, false),
        ];
        let s = stats_on(&todos, today());
        assert_eq!(s.overdue, 1);
        assert_eq!(s.due_today, 1);
        assert_eq!(s.upcoming, 2);
    }

    #[test]
    fn reminders_fall_inside_inclusive_window() {
        let now = today().and_hms_opt(9, 0, 0).unwrap();
        let remind = |mut t: Todo, days: i64, h: u32, m: u32| {
            t.due_date = Some(today() + TimeDelta::days(days));
            t.reminder_time = NaiveTime::from_hms_opt(h, m, 0);
            t
        };

        let todos = vec![
            remind(todo("at now", Priority::Low, false), 0, 9, 0),
            remind(todo("this evening", Priority::Low, false), 0, 18, 0),
            remind(todo("tomorrow at nine", Priority::Low, false), 1, 9, 0),
            remind(todo("tomorrow later", Priority::Low, false), 1, 9, 1),
            remind(todo("passed", Priority::Low, false), 0, 8, 59),
            remind(todo("done", Priority::Low, true), 0, 12, 0),
            due(todo("no reminder", Priority::Low, false), 0),
        ];

        let hits = reminders_due_between(&todos, now, TimeDelta::hours(24));
        let texts: Vec<_> = hits.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["at now", "this evening", "tomorrow at nine"]);
    }

    #[test]
    fn oversized_window_is_clamped_instead_of_overflowing() {
        let now = today().and_hms_opt(9, 0, 0).unwrap();
        let mut far = due(todo("far future", Priority::Low, false), 365 * 100);
        far.reminder_time = NaiveTime::from_hms_opt(9, 0, 0);
        let todos = vec![far, todo("undated", Priority::Low, false)];

        let hits = reminders_due_between(&todos, now, TimeDelta::hours(i64::from(u32::MAX)));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "far future");

        let late = NaiveDateTime::MAX - TimeDelta::hours(1);
        assert!(reminders_due_between(&todos, late, TimeDelta::days(2)).is_empty());
    }

    #[test]
    fn filtering_leaves_input_untouched() {
        let todos = sample();
        let before = todos.clone();
        let _ = filter(&todos, Some("completed"), Some("x"), Some("low"));
        let _ = stats_on(&todos, today());
        assert_eq!(todos, before);
    }
}
