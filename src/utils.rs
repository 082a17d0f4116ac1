use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeDelta, Utc};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Storage format for `created_at` / `updated_at` (microsecond precision, no zone)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
/// Storage and display format for due dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage format for reminder times
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "spicy-todo-dev",
            Profile::Prod => "spicy-todo",
        }
    }
}

/// Get the configuration directory path.
/// If profile is Dev, uses "spicy-todo-dev" instead of "spicy-todo"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "spicy-todo", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path, used for the suggested SQLite file location
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "spicy-todo", profile.app_name())
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT)
}

/// Parse a time of day, either `HH:MM` or `HH:MM:SS`
pub fn parse_time(time_str: &str) -> Result<NaiveTime, chrono::ParseError> {
    let time_str = time_str.trim();
    NaiveTime::parse_from_str(time_str, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time_str, TIME_FORMAT))
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
}

/// Current UTC wall clock, truncated to what the SQLite backend can store
pub fn now_timestamp() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// The `updated_at` to stamp on a write: `now`, or one microsecond past the
/// previous value if the clock has not moved beyond it.
pub fn next_timestamp(previous: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

/// Today's date on the local calendar; due dates are compared against it
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Local wall clock, for combining with due dates and reminder times
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
