use chrono::{NaiveDate, NaiveTime, SecondsFormat, Utc};
use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(&self) -> &'static str {
        match self {
            Profile::Dev => "tripsquad-dev",
            Profile::Prod => "tripsquad",
        }
    }
}

/// Get the configuration directory path for tripsquad
/// If profile is Dev, uses "tripsquad-dev" instead of "tripsquad"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "tripsquad", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the data directory path for tripsquad
pub fn get_data_dir(profile: Profile) -> Option<PathBuf> {
    ProjectDirs::from("com", "tripsquad", profile.app_name())
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
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
}

/// Get the current date as an ISO 8601 string (YYYY-MM-DD)
pub fn get_current_date_string() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Current instant as RFC 3339 with millisecond precision, e.g. `2025-01-01T09:30:00.000Z`
pub fn get_current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Whether `time` is a 24-hour `HH:MM` string
pub fn is_valid_time(time: &str) -> bool {
    time.len() == 5 && NaiveTime::parse_from_str(time, "%H:%M").is_ok()
}

/// Whole days from `today` until `date_str`; negative once the date has passed.
/// Returns `None` if the date cannot be parsed.
pub fn days_until(date_str: &str, today: NaiveDate) -> Option<i64> {
    parse_date(date_str)
        .ok()
        .map(|date| (date - today).num_days())
}

/// Format an amount with the configured currency symbol
pub fn format_money(symbol: &str, amount: f64) -> String {
    if amount < 0.0 {
        format!("-{}{:.2}", symbol, amount.abs())
    } else {
        format!("{}{:.2}", symbol, amount)
    }
}
