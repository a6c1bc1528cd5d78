//! Expansion of a window into single-day contexts.

use chrono::{Duration, NaiveDate};
use serde_json::{Map, Value};

use crate::types::window::{DayContext, ExtractionWindow};

/// Lazy, chronological iterator over the days of a window, both ends
/// included. Cloning restarts nothing: it is a pure function of the window.
#[derive(Debug, Clone)]
pub struct DayWindows {
    next: Option<NaiveDate>,
    end: NaiveDate,
    index: String,
    extra: Map<String, Value>,
}

/// Iterate the days of `window` for `index`, carrying `extra` into each day.
pub fn iterate(window: ExtractionWindow, index: &str, extra: &Map<String, Value>) -> DayWindows {
    DayWindows {
        next: (!window.is_empty()).then_some(window.start),
        end: window.end,
        index: index.to_string(),
        extra: extra.clone(),
    }
}

impl Iterator for DayWindows {
    type Item = DayContext;

    fn next(&mut self) -> Option<DayContext> {
        let date = self.next?;
        self.next = (date < self.end).then(|| date + Duration::days(1));
        Some(DayContext::new(date, self.index.clone()).with_extra(&self.extra))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .map_or(0, |d| (self.end - d).num_days() as usize + 1);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DayWindows {}
