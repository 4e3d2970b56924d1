use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Inclusive iterator over calendar days, ascending.
#[derive(Debug, Clone)]
pub struct DateRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl DateRange {
    /// Empty when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            next: (start <= end).then_some(start),
            end,
        }
    }

    /// Number of days in an inclusive range, 0 when reversed.
    pub fn len_days(start: NaiveDate, end: NaiveDate) -> i64 {
        if start > end {
            0
        } else {
            (end - start).num_days() + 1
        }
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = if current < self.end {
            current.succ_opt()
        } else {
            None
        };
        Some(current)
    }
}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp. Timestamps are reduced to
/// the calendar date they fall on in `tz`.
pub fn parse_date(raw: &str, tz: Tz) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&tz).date_naive())
}

/// Today's date in `tz`.
pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}
