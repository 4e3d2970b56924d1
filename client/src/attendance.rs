use chrono::NaiveDate;

use crate::client::MessClient;
use crate::error::ClientError;
use crate::session::Session;
use crate::types::{AttendanceRecord, DataEnvelope, Meal, MarkMeal};

/// `/attendance` endpoints.
pub struct AttendanceApi<'a> {
    client: &'a MessClient,
}

impl<'a> AttendanceApi<'a> {
    pub(crate) fn new(client: &'a MessClient) -> Self {
        Self { client }
    }

    /// Marks `meal` for the signed-in user. `date` defaults to today on the server.
    pub async fn mark_meal(
        &self,
        session: &mut Session,
        meal: Meal,
        date: Option<NaiveDate>,
    ) -> Result<AttendanceRecord, ClientError> {
        let body = MarkMeal {
            meal,
            date,
            user_id: None,
        };
        let request = self.client.post("/attendance").json(&body);
        self.client.send_authed(session, request).await
    }

    /// Staff only: marks `meal` for another student.
    pub async fn mark_meal_for(
        &self,
        session: &mut Session,
        user_id: u64,
        meal: Meal,
        date: Option<NaiveDate>,
    ) -> Result<AttendanceRecord, ClientError> {
        let body = MarkMeal {
            meal,
            date,
            user_id: Some(user_id),
        };
        let request = self.client.post("/attendance").json(&body);
        self.client.send_authed(session, request).await
    }

    /// One record per day of `[start, end]`, ascending.
    pub async fn my_attendance(
        &self,
        session: &mut Session,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, ClientError> {
        let request = self.client.get("/attendance/my-attendance").query(&[
            ("startDate", start.format("%Y-%m-%d").to_string()),
            ("endDate", end.format("%Y-%m-%d").to_string()),
        ]);
        let envelope: DataEnvelope<Vec<AttendanceRecord>> =
            self.client.send_authed(session, request).await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttendanceStatus, LeaveReason};
    use chrono::{Duration, Utc};
    use mockito::Matcher;

    fn session() -> Session {
        Session::new("asha", "access-1", "refresh-1", Utc::now() + Duration::minutes(10))
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn my_attendance_sends_range_and_token() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/attendance/my-attendance")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("startDate".into(), "2024-03-10".into()),
                Matcher::UrlEncoded("endDate".into(), "2024-03-11".into()),
            ]))
            .match_header("authorization", "Bearer access-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[
                    {"user":1,"date":"2024-03-10","breakfast":false,"lunch":false,"dinner":false,
                     "totalMealsPresent":0,"isOnLeave":true,"leaveReason":"sick_leave","status":"On Leave"},
                    {"user":1,"date":"2024-03-11","breakfast":true,"lunch":false,"dinner":false,
                     "totalMealsPresent":1,"isOnLeave":false,"status":"Present"}
                ]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = MessClient::new(format!("{}/api", server.url())).unwrap();
        let mut session = session();
        let days = client
            .attendance()
            .my_attendance(&mut session, d(2024, 3, 10), d(2024, 3, 11))
            .await
            .unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].status(), AttendanceStatus::OnLeave);
        assert_eq!(days[0].leave_reason, Some(LeaveReason::SickLeave));
        assert_eq!(days[1].status(), AttendanceStatus::Present);
        assert!(days[1].breakfast);
    }

    #[tokio::test]
    async fn mark_meal_for_sends_user_id() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/attendance")
            .match_body(Matcher::Json(
                serde_json::json!({"meal": "dinner", "date": "2024-03-10", "userId": 12}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"user":12,"date":"2024-03-10","breakfast":false,"lunch":false,"dinner":true,
                    "totalMealsPresent":1,"isOnLeave":false,"status":"Present"}"#,
            )
            .create_async()
            .await;

        let client = MessClient::new(format!("{}/api", server.url())).unwrap();
        let mut session = session();
        let record = client
            .attendance()
            .mark_meal_for(&mut session, 12, Meal::Dinner, Some(d(2024, 3, 10)))
            .await
            .unwrap();
        assert!(record.dinner);
        assert_eq!(record.total_meals_present, 1);
    }

    #[tokio::test]
    async fn validation_errors_keep_the_server_message() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/attendance/my-attendance")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"startDate cannot be after endDate"}"#)
            .create_async()
            .await;

        let client = MessClient::new(format!("{}/api", server.url())).unwrap();
        let mut session = session();
        let err = client
            .attendance()
            .my_attendance(&mut session, d(2024, 3, 15), d(2024, 3, 10))
            .await
            .unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "startDate cannot be after endDate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
