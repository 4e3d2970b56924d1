use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    Vacation,
    SickLeave,
    HomeVisit,
    Emergency,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "On Leave")]
    OnLeave,
    Present,
    Absent,
}

impl AttendanceStatus {
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

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub breakfast: bool,
    #[serde(default)]
    pub lunch: bool,
    #[serde(default)]
    pub dinner: bool,
    pub total_meals_present: u32,
    pub is_on_leave: bool,
    #[serde(default)]
    pub leave_reason: Option<LeaveReason>,
    /// Filled by the server; older servers leave it out.
    #[serde(default)]
    pub status: Option<AttendanceStatus>,
}

impl AttendanceRecord {
    /// Server-provided status, or the same rule applied locally.
    pub fn status(&self) -> AttendanceStatus {
        self.status
            .unwrap_or_else(|| AttendanceStatus::derive(self.is_on_leave, self.total_meals_present))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRegistration {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: LeaveReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LeaveRegistration {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, reason: LeaveReason) -> Self {
        Self {
            start_date,
            end_date,
            reason,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leave {
    pub id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: LeaveReason,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarkMeal {
    pub meal: Meal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_without_status_derives_it() {
        let record: AttendanceRecord = serde_json::from_str(
            r#"{"date":"2024-03-10","totalMealsPresent":2,"isOnLeave":true,"leaveReason":"home_visit"}"#,
        )
        .unwrap();
        assert_eq!(record.status(), AttendanceStatus::OnLeave);
        assert_eq!(record.leave_reason, Some(LeaveReason::HomeVisit));
    }

    #[test]
    fn registration_uses_wire_names() {
        let body = serde_json::to_value(
            LeaveRegistration::new(
                NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 12).unwrap(),
                LeaveReason::SickLeave,
            )
            .with_description("Fever"),
        )
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "startDate": "2024-03-10",
                "endDate": "2024-03-12",
                "reason": "sick_leave",
                "description": "Fever"
            })
        );
    }
}
