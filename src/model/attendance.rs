use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::leave_request::LeaveReason;
use crate::utils::dates::DateRange;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct MealPresence {
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
}

impl MealPresence {
    pub fn only(meal: Meal) -> Self {
        let mut presence = Self::default();
        presence.mark(meal);
        presence
    }

    pub fn mark(&mut self, meal: Meal) {
        match meal {
            Meal::Breakfast => self.breakfast = true,
            Meal::Lunch => self.lunch = true,
            Meal::Dinner => self.dinner = true,
        }
    }

    pub fn total(&self) -> u32 {
        [self.breakfast, self.lunch, self.dinner]
            .into_iter()
            .filter(|present| *present)
            .count() as u32
    }
}

/// Display status of a day. Computed at read time, never stored.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema, Display)]
pub enum AttendanceStatus {
    #[serde(rename = "On Leave")]
    #[strum(serialize = "On Leave")]
    OnLeave,
    Present,
    Absent,
}

impl AttendanceStatus {
    /// Leave always wins over meal presence.
    pub fn derive(is_on_leave: bool, total_meals_present: u32) -> Self {
        if is_on_leave {
            AttendanceStatus::OnLeave
        } else if total_meals_present > 0 {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        }
    }
}

/// One row per (user, date).
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub user: u64,
    pub date: NaiveDate,
    pub meals: MealPresence,
    pub is_on_leave: bool,
    /// Only meaningful while `is_on_leave` is set.
    pub leave_reason: Option<LeaveReason>,
}

impl AttendanceRecord {
    pub fn empty(user: u64, date: NaiveDate) -> Self {
        Self {
            user,
            date,
            meals: MealPresence::default(),
            is_on_leave: false,
            leave_reason: None,
        }
    }

    pub fn total_meals_present(&self) -> u32 {
        self.meals.total()
    }

    pub fn status(&self) -> AttendanceStatus {
        AttendanceStatus::derive(self.is_on_leave, self.total_meals_present())
    }

    pub fn reason(&self) -> Option<LeaveReason> {
        if self.is_on_leave {
            self.leave_reason
        } else {
            None
        }
    }
}

/// Expands stored rows into one record per day of `[start, end]`.
///
/// Days without a stored row get an empty record; rows outside the range
/// are ignored.
pub fn fill_range(
    user: u64,
    start: NaiveDate,
    end: NaiveDate,
    stored: Vec<AttendanceRecord>,
) -> Vec<AttendanceRecord> {
    let mut by_date: BTreeMap<NaiveDate, AttendanceRecord> = stored
        .into_iter()
        .filter(|r| r.date >= start && r.date <= end)
        .map(|r| (r.date, r))
        .collect();

    DateRange::new(start, end)
        .map(|date| {
            by_date
                .remove(&date)
                .unwrap_or_else(|| AttendanceRecord::empty(user, date))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[rstest]
    #[case(true, 0, AttendanceStatus::OnLeave)]
    #[case(true, 3, AttendanceStatus::OnLeave)]
    #[case(false, 1, AttendanceStatus::Present)]
    #[case(false, 3, AttendanceStatus::Present)]
    #[case(false, 0, AttendanceStatus::Absent)]
    fn status_derivation(
        #[case] is_on_leave: bool,
        #[case] meals: u32,
        #[case] expected: AttendanceStatus,
    ) {
        assert_eq!(AttendanceStatus::derive(is_on_leave, meals), expected);
    }

    #[test]
    fn status_serializes_as_display_text() {
        assert_eq!(
            serde_json::to_value(AttendanceStatus::OnLeave).unwrap(),
            serde_json::json!("On Leave")
        );
        assert_eq!(AttendanceStatus::OnLeave.to_string(), "On Leave");
        assert_eq!(AttendanceStatus::Absent.to_string(), "Absent");
    }

    #[test]
    fn marking_a_meal_twice_counts_once() {
        let mut meals = MealPresence::only(Meal::Breakfast);
        meals.mark(Meal::Breakfast);
        assert_eq!(meals.total(), 1);
        meals.mark(Meal::Dinner);
        assert_eq!(meals.total(), 2);
    }

    #[test]
    fn reason_hidden_when_not_on_leave() {
        let mut record = AttendanceRecord::empty(1, d("2024-03-10"));
        record.leave_reason = Some(LeaveReason::Vacation);
        assert_eq!(record.reason(), None);
        record.is_on_leave = true;
        assert_eq!(record.reason(), Some(LeaveReason::Vacation));
    }

    #[test]
    fn fill_range_has_no_gaps_and_keeps_stored_rows() {
        let mut lunch = AttendanceRecord::empty(4, d("2024-03-02"));
        lunch.meals.mark(Meal::Lunch);
        let outside = AttendanceRecord::empty(4, d("2024-04-01"));

        let filled = fill_range(4, d("2024-03-01"), d("2024-03-05"), vec![outside, lunch.clone()]);

        assert_eq!(filled.len(), 5);
        assert!(filled.windows(2).all(|w| w[0].date.succ_opt() == Some(w[1].date)));
        assert_eq!(filled[1], lunch);
        assert_eq!(filled[0].status(), AttendanceStatus::Absent);
        assert_eq!(filled[1].status(), AttendanceStatus::Present);
    }
}
