use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

pub const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    ToSchema,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveReason {
    Vacation,
    SickLeave,
    HomeVisit,
    Emergency,
    #[default]
    Other,
}

impl LeaveReason {
    pub const ALLOWED: &'static str = "vacation, sick_leave, home_visit, emergency, other";
}

/// A stored leave registration.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveRequest {
    pub id: u64,
    pub user: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: LeaveReason,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A leave registration that passed validation and is ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLeave {
    pub user: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: LeaveReason,
    pub description: Option<String>,
}

impl NewLeave {
    /// Checks the range, the reason and the description length.
    ///
    /// `reason` is the raw value from the request, matched case-insensitively
    /// and required. Blank descriptions are dropped.
    pub fn validate(
        user: u64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: &str,
        description: Option<&str>,
        max_range_days: u32,
    ) -> Result<Self, String> {
        if start_date > end_date {
            return Err("startDate cannot be after endDate".to_string());
        }

        let days = (end_date - start_date).num_days() + 1;
        if days > i64::from(max_range_days) {
            return Err(format!(
                "Leave cannot span more than {max_range_days} days (got {days})"
            ));
        }

        let raw = reason.trim();
        if raw.is_empty() {
            return Err(format!("reason is required. Allowed: {}", LeaveReason::ALLOWED));
        }
        let reason = raw.to_lowercase().parse::<LeaveReason>().map_err(|_| {
            format!("Invalid leave reason '{raw}'. Allowed: {}", LeaveReason::ALLOWED)
        })?;

        let description = description.map(str::trim).filter(|d| !d.is_empty());
        if let Some(d) = description {
            if d.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(format!(
                    "Description cannot exceed {MAX_DESCRIPTION_CHARS} characters"
                ));
            }
        }

        Ok(Self {
            user,
            start_date,
            end_date,
            reason,
            description: description.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn reason_wire_names_match_serde_and_strum() {
        for reason in LeaveReason::iter() {
            let json = serde_json::to_value(reason).unwrap();
            assert_eq!(json, serde_json::Value::String(reason.to_string()));
            assert_eq!(reason.as_ref().parse::<LeaveReason>().unwrap(), reason);
        }
        assert_eq!(LeaveReason::SickLeave.as_ref(), "sick_leave");
    }

    #[rstest]
    #[case("sick_leave", LeaveReason::SickLeave)]
    #[case("home_visit", LeaveReason::HomeVisit)]
    #[case(" vacation ", LeaveReason::Vacation)]
    #[case("Emergency", LeaveReason::Emergency)]
    #[case("OTHER", LeaveReason::Other)]
    fn accepts_known_reasons(#[case] raw: &str, #[case] expected: LeaveReason) {
        let leave =
            NewLeave::validate(7, d("2024-03-10"), d("2024-03-12"), raw, None, 366).unwrap();
        assert_eq!(leave.reason, expected);
    }

    #[test]
    fn rejects_unknown_reason() {
        let err = NewLeave::validate(7, d("2024-03-10"), d("2024-03-12"), "party", None, 366)
            .unwrap_err();
        assert!(err.contains("Invalid leave reason"));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn rejects_blank_reason(#[case] raw: &str) {
        let err = NewLeave::validate(7, d("2024-03-10"), d("2024-03-12"), raw, None, 366)
            .unwrap_err();
        assert!(err.starts_with("reason is required"));
    }

    #[test]
    fn default_reason_is_other() {
        assert_eq!(LeaveReason::default(), LeaveReason::Other);
    }

    #[test]
    fn rejects_reversed_range() {
        let err = NewLeave::validate(7, d("2024-03-15"), d("2024-03-10"), "other", None, 366)
            .unwrap_err();
        assert_eq!(err, "startDate cannot be after endDate");
    }

    #[test]
    fn single_day_leave_is_valid() {
        assert!(NewLeave::validate(7, d("2024-03-10"), d("2024-03-10"), "other", None, 1).is_ok());
    }

    #[test]
    fn rejects_ranges_longer_than_the_cap() {
        assert!(NewLeave::validate(7, d("2024-03-01"), d("2024-03-31"), "other", None, 30).is_err());
        assert!(NewLeave::validate(7, d("2024-03-01"), d("2024-03-30"), "other", None, 30).is_ok());
    }

    #[test]
    fn description_limit_counts_characters_not_bytes() {
        let exactly = "é".repeat(MAX_DESCRIPTION_CHARS);
        assert!(
            NewLeave::validate(7, d("2024-03-10"), d("2024-03-10"), "other", Some(&exactly), 366)
                .is_ok()
        );

        let too_long = "a".repeat(MAX_DESCRIPTION_CHARS + 1);
        let err =
            NewLeave::validate(7, d("2024-03-10"), d("2024-03-10"), "other", Some(&too_long), 366)
                .unwrap_err();
        assert!(err.contains("500"));
    }

    #[test]
    fn blank_description_is_dropped() {
        let leave =
            NewLeave::validate(7, d("2024-03-10"), d("2024-03-10"), "other", Some("   "), 366)
                .unwrap();
        assert_eq!(leave.description, None);
    }
}
