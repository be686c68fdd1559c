//! Inclusive calendar date range for a request.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{HabitatError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Rejects `start > end`; a single day (`start == end`) is allowed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(HabitatError::InvalidDateRange { start: start.to_string(), end: end.to_string() });
        }
        Ok(Self { start, end })
    }

    /// Number of days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Calendar date halfway through the range.
    pub fn midpoint(&self) -> NaiveDate {
        self.start + (self.end - self.start) / 2
    }

    /// Month (1-12) of the midpoint; drives seasonal terms.
    pub fn mid_month(&self) -> u32 {
        self.midpoint().month()
    }

    /// Days since 0001-01-01, used as a stable seed component.
    pub fn start_day_number(&self) -> i64 {
        self.start.num_days_from_ce() as i64
    }

    pub fn end_day_number(&self) -> i64 {
        self.end.num_days_from_ce() as i64
    }

    /// Split into calendar-month pieces, clipped to the range.
    pub fn months(&self) -> Vec<DateRange> {
        let mut out = Vec::new();
        let mut cursor = self.start;
        while cursor <= self.end {
            let next = cursor.with_day(1).and_then(|first| first.checked_add_months(Months::new(1)));
            let Some(next) = next else {
                out.push(DateRange { start: cursor, end: self.end });
                break;
            };
            let end = next.pred_opt().map_or(self.end, |last| last.min(self.end));
            out.push(DateRange { start: cursor, end });
            cursor = next;
        }
        out
    }
}
