//! Resolution of the `[start, end]` window for one run.
//!
//! Start date, highest precedence first:
//! 1. caller override
//! 2. day after the bookmark
//! 3. configured `start_date`
//! 4. `today - window_days`
//!
//! End date: caller override, then configured `end_date`, then today.
//! Any date that fails to parse, or whose arithmetic leaves chrono's range,
//! is logged and skipped.

use chrono::{Days, NaiveDate, Utc};
use tracing::{info, warn};

use crate::types::window::{parse_date, parse_day, ExtractionOverrides, ExtractionWindow};

#[derive(Debug, Clone)]
pub struct DateRangeResolver {
    today: NaiveDate,
    window_days: u32,
    config_start: Option<String>,
    config_end: Option<String>,
}

impl DateRangeResolver {
    /// Resolver with a cold-start window of `window_days` ending today (UTC).
    pub fn new(window_days: u32) -> Self {
        Self {
            today: Utc::now().date_naive(),
            window_days,
            config_start: None,
            config_end: None,
        }
    }

    /// Pin "today".
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Configured dates, used below the bookmark and override tiers.
    pub fn with_config_dates(mut self, start: Option<String>, end: Option<String>) -> Self {
        self.config_start = start;
        self.config_end = end;
        self
    }

    /// Compute the window. Never fails; an empty window means nothing to do.
    pub fn resolve(&self, bookmark: Option<&str>, overrides: &ExtractionOverrides) -> ExtractionWindow {
        let end = parse_tier("override end_date", overrides.end_date.as_deref(), parse_day)
            .or_else(|| parse_tier("config end_date", self.config_end.as_deref(), parse_date))
            .unwrap_or(self.today);

        let start = parse_tier("override start_date", overrides.start_date.as_deref(), parse_day)
            .or_else(|| self.resume_point(bookmark))
            .or_else(|| parse_tier("config start_date", self.config_start.as_deref(), parse_date))
            .unwrap_or_else(|| self.cold_start());

        ExtractionWindow::new(start, end)
    }

    fn cold_start(&self) -> NaiveDate {
        match self.today.checked_sub_days(Days::new(u64::from(self.window_days))) {
            Some(start) => start,
            None => {
                warn!(
                    window_days = self.window_days,
                    today = %self.today,
                    "Window reaches before the earliest date, starting today"
                );
                self.today
            }
        }
    }

    fn resume_point(&self, bookmark: Option<&str>) -> Option<NaiveDate> {
        let raw = bookmark?;
        match parse_date(raw) {
            Some(last) => match last.checked_add_days(Days::new(1)) {
                Some(start) => {
                    info!(last_date = %last, resume_from = %start, "Resuming from bookmark");
                    Some(start)
                }
                None => {
                    warn!(bookmark = raw, "Bookmark is at the last representable date, ignoring it");
                    None
                }
            },
            None => {
                warn!(bookmark = raw, "Could not parse bookmark date, ignoring it");
                None
            }
        }
    }
}

fn parse_tier(
    label: &str,
    value: Option<&str>,
    parse: fn(&str) -> Option<NaiveDate>,
) -> Option<NaiveDate> {
    let raw = value?;
    let parsed = parse(raw);
    if parsed.is_none() {
        warn!(source = label, value = raw, "Invalid date format, falling back");
    }
    parsed
}
