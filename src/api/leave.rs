use crate::api::attendance::require_date;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::leave_request::{LeaveReason, LeaveRequest};
use crate::store::AttendanceStore;
use crate::tracker::{self, LeaveInput};
use crate::utils::dates::DateRange;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterLeave {
    #[schema(example = "2024-03-10")]
    pub start_date: String,
    #[schema(example = "2024-03-12")]
    pub end_date: String,
    #[schema(example = "sick_leave")]
    /// vacation, sick_leave, home_visit, emergency or other
    pub reason: String,
    #[schema(example = "Fever, going home", nullable = true)]
    /// Up to 500 characters
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "2024-03-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-03-12", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: LeaveReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[schema(example = "2024-03-09T08:30:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<LeaveRequest> for LeaveResponse {
    fn from(leave: LeaveRequest) -> Self {
        Self {
            id: leave.id,
            start_date: leave.start_date,
            end_date: leave.end_date,
            reason: leave.reason,
            description: leave.description,
            created_at: leave.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveCreatedResponse {
    #[schema(example = "Leave registered successfully")]
    pub message: String,
    #[schema(example = 3)]
    pub days_affected: i64,
    pub data: LeaveResponse,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveResponse>,
}

/// Register leave; every day of the range is marked "On Leave" immediately
#[utoipa::path(
    post,
    path = "/api/attendance/leave",
    request_body(
        content = RegisterLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave registered", body = LeaveCreatedResponse),
        (status = 400, description = "Reversed range, missing or unknown reason, or description too long", body = Object, example = json!({
            "message": "startDate cannot be after endDate"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
#[instrument(name = "register_leave", skip_all, fields(user_id = auth.user_id))]
pub async fn register_leave(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
    config: web::Data<Config>,
    payload: web::Json<RegisterLeave>,
) -> Result<impl Responder, ApiError> {
    let input = LeaveInput {
        start_date: require_date(&payload.start_date, "startDate", config.timezone)?,
        end_date: require_date(&payload.end_date, "endDate", config.timezone)?,
        reason: &payload.reason,
        description: payload.description.as_deref(),
    };

    let leave =
        tracker::register_leave(store.get_ref(), auth.user_id, input, config.max_range_days)
            .await?;

    Ok(HttpResponse::Created().json(LeaveCreatedResponse {
        message: "Leave registered successfully".to_string(),
        days_affected: DateRange::len_days(leave.start_date, leave.end_date),
        data: leave.into(),
    }))
}

/// Leave history of the caller, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/leave",
    responses(
        (status = 200, description = "Leave history", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    store: web::Data<dyn AttendanceStore>,
) -> Result<impl Responder, ApiError> {
    let leaves = store.leaves_for(auth.user_id).await?;
    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves.into_iter().map(Into::into).collect(),
    }))
}
