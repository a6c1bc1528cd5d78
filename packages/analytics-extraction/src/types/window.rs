//! Date windows and per-day request contexts.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire format for every date the API accepts or the tap emits.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Context keys that are owned by the day window and never passed through.
const RESERVED_CONTEXT_KEYS: [&str; 4] = ["start_date", "end_date", "date", "state"];

/// Parse a strict `YYYY-MM-DD` date: four-digit year, no sign, no time part.
///
/// Used for caller overrides.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let plain = value.len() == 10
        && value
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if !plain {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Parse a stored or configured date.
///
/// Accepts `YYYY-MM-DD` and RFC 3339 datetimes, truncated to their date part,
/// since bookmarks may be written by other tooling.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Inclusive `[start, end]` range for one extraction run.
///
/// A window with `start > end` is empty rather than invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ExtractionWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// True when there is nothing to process.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Number of calendar days covered, both endpoints included.
    pub fn day_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }
}

/// Context for a single-day request.
///
/// `start_date` and `end_date` always equal `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct DayContext {
    pub date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub index: String,
    /// Caller pass-through fields, never sent to the API.
    pub extra: Map<String, Value>,
}

impl DayContext {
    pub fn new(date: NaiveDate, index: impl Into<String>) -> Self {
        Self {
            date,
            start_date: date,
            end_date: date,
            index: index.into(),
            extra: Map::new(),
        }
    }

    /// Copy caller fields, skipping the keys the day window owns.
    pub fn with_extra(mut self, extra: &Map<String, Value>) -> Self {
        for (key, value) in extra {
            if !RESERVED_CONTEXT_KEYS.contains(&key.as_str()) {
                self.extra.insert(key.clone(), value.clone());
            }
        }
        self
    }

    /// The day as `YYYY-MM-DD`.
    pub fn iso_date(&self) -> String {
        format_date(self.date)
    }
}

/// Explicit caller context for a run.
///
/// Dates are kept as raw strings and must be plain `YYYY-MM-DD`. Anything
/// else is logged and ignored during resolution instead of failing the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOverrides {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub extra: Map<String, Value>,
}

impl ExtractionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn with_end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    /// Add a pass-through field.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_parse_date_accepts_plain_and_rfc3339() {
        assert_eq!(parse_date("2024-01-10"), Some(date("2024-01-10")));
        assert_eq!(parse_date(" 2024-01-10 "), Some(date("2024-01-10")));
        assert_eq!(parse_date("2024-01-10T23:15:00+00:00"), Some(date("2024-01-10")));
        assert_eq!(parse_date("10/01/2024"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_day_is_strict() {
        assert_eq!(parse_day("2024-01-10"), Some(date("2024-01-10")));
        assert_eq!(parse_day(" 2024-01-10 "), Some(date("2024-01-10")));
        assert_eq!(parse_day("2024-01-10T23:15:00+00:00"), None);
        assert_eq!(parse_day("+262142-12-31"), None);
        assert_eq!(parse_day("2024-1-10"), None);
        assert_eq!(parse_day("2024-02-30"), None);
    }

    #[test]
    fn test_window_day_count() {
        let window = ExtractionWindow::new(date("2024-03-01"), date("2024-03-03"));
        assert_eq!(window.day_count(), 3);
        assert!(!window.is_empty());

        let single = ExtractionWindow::new(date("2024-03-01"), date("2024-03-01"));
        assert_eq!(single.day_count(), 1);

        let empty = ExtractionWindow::new(date("2024-03-02"), date("2024-03-01"));
        assert!(empty.is_empty());
        assert_eq!(empty.day_count(), 0);
    }

    #[test]
    fn test_day_context_drops_reserved_keys() {
        let mut extra = Map::new();
        extra.insert("start_date".into(), Value::from("2020-01-01"));
        extra.insert("state".into(), Value::from("x"));
        extra.insert("run_id".into(), Value::from("abc"));

        let day = DayContext::new(date("2024-05-05"), "prod").with_extra(&extra);

        assert_eq!(day.start_date, day.date);
        assert_eq!(day.end_date, day.date);
        assert_eq!(day.extra.len(), 1);
        assert_eq!(day.extra["run_id"], "abc");
        assert_eq!(day.iso_date(), "2024-05-05");
    }
}
