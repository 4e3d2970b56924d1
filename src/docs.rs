use crate::api::attendance::{AttendanceListResponse, AttendanceRecordResponse, MarkAttendance};
use crate::api::leave::{LeaveCreatedResponse, LeaveListResponse, LeaveResponse, RegisterLeave};
use crate::model::attendance::{AttendanceStatus, Meal};
use crate::model::leave_request::LeaveReason;
use crate::models::{LoginReqDto, RegisterReq, TokenPair};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mess Attendance API",
        version = "1.0.0",
        description = r#"
## Hostel mess attendance & leave tracking

Students sign in, register leave and review their daily attendance.
Attendance for a day is derived from the meals served to the student
and is overridden by any leave covering that day:

- **On Leave** when a registered leave covers the date
- **Present** when at least one meal was served
- **Absent** otherwise

Leave registration is immediate; there is no approval step.

### Security
All attendance endpoints require a **JWT Bearer** access token obtained
from `/api/auth/login`.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::attendance::mark_attendance,
        crate::api::attendance::my_attendance,

        crate::api::leave::register_leave,
        crate::api::leave::my_leaves
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            MarkAttendance,
            Meal,
            AttendanceStatus,
            AttendanceRecordResponse,
            AttendanceListResponse,
            RegisterLeave,
            LeaveReason,
            LeaveResponse,
            LeaveCreatedResponse,
            LeaveListResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Sign-up, sign-in and token rotation"),
        (name = "Attendance", description = "Meal marking and attendance history"),
        (name = "Leave", description = "Leave registration and history"),
    )
)]
pub struct ApiDoc;
