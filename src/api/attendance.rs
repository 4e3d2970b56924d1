use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, Meal};
use crate::model::leave_request::LeaveReason;
use crate::store::{AttendanceStore, UserStore};
use crate::tracker;
use crate::utils::dates::{parse_date, today};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendance {
    #[schema(example = "lunch")]
    /// breakfast, lunch or dinner
    pub meal: String,
    #[schema(example = "2024-03-10", nullable = true)]
    /// Day of the meal, defaults to today in the configured timezone
    pub date: Option<String>,
    #[schema(example = 12, nullable = true)]
    /// Student to mark; only managers and admins may set it
    pub user_id: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// First day, `YYYY-MM-DD` or RFC 3339
    #[param(example = "2024-03-01")]
    pub start_date: String,
    /// Last day (inclusive)
    #[param(example = "2024-03-31")]
    pub end_date: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecordResponse {
    #[schema(example = 12)]
    pub user: u64,
    #[schema(example = "2024-03-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
    #[schema(example = 2)]
    pub total_meals_present: u32,
    pub is_on_leave: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "sick_leave", nullable = true)]
    pub leave_reason: Option<LeaveReason>,
    #[schema(example = "Present")]
    pub status: AttendanceStatus,
}

impl From<AttendanceRecord> for AttendanceRecordResponse {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            user: record.user,
            date: record.date,
            breakfast: record.meals.breakfast,
            lunch: record.meals.lunch,
            dinner: record.meals.dinner,
            total_meals_present: record.total_meals_present(),
            is_on_leave: record.is_on_leave,
            leave_reason: record.reason(),
            status: record.status(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRecordResponse>,
}

pub(crate) fn require_date(raw: &str, field: &str, tz: Tz) -> Result<NaiveDate, ApiError> {
    parse_date(raw, tz).ok_or_else(|| {
        ApiError::validation(format!(
            "{field} must be a date (YYYY-MM-DD) or an ISO-8601 timestamp"
        ))
    })
}

/// Mark a meal as attended
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = MarkAttendance,
    responses(
        (status = 200, description = "Meal recorded", body = AttendanceRecordResponse),
        (status = 400, description = "Unknown meal, bad date or unknown user"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Marking another user requires manager/admin")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "mark_attendance", skip_all, fields(user_id = auth.user_id))]
pub async fn mark_attendance(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    users: web::Data<dyn UserStore>,
    config: web::Data<Config>,
    payload: web::Json<MarkAttendance>,
) -> Result<impl Responder, ApiError> {
    let meal: Meal = payload.meal.trim().to_lowercase().parse().map_err(|_| {
        ApiError::validation("Invalid meal. Allowed: breakfast, lunch, dinner")
    })?;

    let date = match payload.date.as_deref() {
        Some(raw) => require_date(raw, "date", config.timezone)?,
        None => today(config.timezone),
    };

    let target = match payload.user_id {
        Some(id) if id != auth.user_id => {
            auth.require_staff()?;
            if users.find_user_by_id(id).await?.is_none() {
                return Err(ApiError::validation(format!("Unknown userId {id}")));
            }
            id
        }
        _ => auth.user_id,
    };

    let record = tracker::mark_meal(store.get_ref(), target, date, meal).await?;
    Ok(HttpResponse::Ok().json(AttendanceRecordResponse::from(record)))
}

/// Attendance of the caller for a date range, one entry per day
#[utoipa::path(
    get,
    path = "/api/attendance/my-attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "One record per day, ascending", body = AttendanceListResponse),
        (status = 400, description = "Bad or reversed date range"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
#[instrument(name = "my_attendance", skip_all, fields(user_id = auth.user_id))]
pub async fn my_attendance(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    config: web::Data<Config>,
    query: web::Query<AttendanceQuery>,
) -> Result<impl Responder, ApiError> {
    let start = require_date(&query.start_date, "startDate", config.timezone)?;
    let end = require_date(&query.end_date, "endDate", config.timezone)?;

    let records =
        tracker::get_attendance(store.get_ref(), auth.user_id, start, end, config.max_range_days)
            .await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data: records.into_iter().map(Into::into).collect(),
    }))
}
