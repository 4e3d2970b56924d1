//! Leave-aware attendance: registration, range queries and meal marking.
//!
//! Everything here validates before touching the store, so a rejected
//! request never mutates anything.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, Meal, fill_range};
use crate::model::leave_request::{LeaveRequest, NewLeave};
use crate::store::AttendanceStore;
use crate::utils::dates::DateRange;

/// Raw leave registration as received from a caller.
#[derive(Debug, Clone, Copy)]
pub struct LeaveInput<'a> {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: &'a str,
    pub description: Option<&'a str>,
}

pub async fn register_leave(
    store: &dyn AttendanceStore,
    user: u64,
    input: LeaveInput<'_>,
    max_range_days: u32,
) -> Result<LeaveRequest, ApiError> {
    let leave = NewLeave::validate(
        user,
        input.start_date,
        input.end_date,
        input.reason,
        input.description,
        max_range_days,
    )
    .map_err(ApiError::Validation)?;

    let stored = store.register_leave(&leave).await?;

    info!(
        user,
        leave_id = stored.id,
        start = %stored.start_date,
        end = %stored.end_date,
        reason = %stored.reason,
        "Leave registered"
    );
    Ok(stored)
}

/// One record per day of `[start, end]`, ascending, with empty days filled in.
pub async fn get_attendance(
    store: &dyn AttendanceStore,
    user: u64,
    start: NaiveDate,
    end: NaiveDate,
    max_range_days: u32,
) -> Result<Vec<AttendanceRecord>, ApiError> {
    if start > end {
        return Err(ApiError::validation("startDate cannot be after endDate"));
    }
    let days = DateRange::len_days(start, end);
    if days > i64::from(max_range_days) {
        return Err(ApiError::validation(format!(
            "Date range cannot span more than {max_range_days} days (got {days})"
        )));
    }

    let stored = store.records_between(user, start, end).await?;
    debug!(user, stored = stored.len(), days, "Attendance rows loaded");

    Ok(fill_range(user, start, end, stored))
}

pub async fn mark_meal(
    store: &dyn AttendanceStore,
    user: u64,
    date: NaiveDate,
    meal: Meal,
) -> Result<AttendanceRecord, ApiError> {
    let record = store.mark_meal(user, date, meal).await?;
    debug!(user, %date, %meal, total = record.total_meals_present(), "Meal marked");
    Ok(record)
}
