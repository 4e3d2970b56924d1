use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};

use super::{AttendanceStore, UserStore};
use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, Meal, MealPresence};
use crate::model::leave_request::{LeaveReason, LeaveRequest, NewLeave};
use crate::model::role::Role;
use crate::model::user::User;
use crate::utils::dates::DateRange;

const SELECT_RECORD: &str = r#"
    SELECT user_id, date, breakfast, lunch, dinner, is_on_leave, leave_reason
    FROM attendance_records
"#;

const SELECT_LEAVE: &str = r#"
    SELECT id, user_id, start_date, end_date, reason, description, created_at
    FROM leave_requests
"#;

const SELECT_USER: &str = r#"
    SELECT id, username, password, role_id, is_active
    FROM users
"#;

#[derive(FromRow)]
struct AttendanceRow {
    user_id: u64,
    date: NaiveDate,
    breakfast: bool,
    lunch: bool,
    dinner: bool,
    is_on_leave: bool,
    leave_reason: Option<String>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StoreError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let leave_reason = row
            .leave_reason
            .as_deref()
            .map(parse_reason)
            .transpose()?;

        Ok(AttendanceRecord {
            user: row.user_id,
            date: row.date,
            meals: MealPresence {
                breakfast: row.breakfast,
                lunch: row.lunch,
                dinner: row.dinner,
            },
            is_on_leave: row.is_on_leave,
            leave_reason,
        })
    }
}

#[derive(FromRow)]
struct LeaveRow {
    id: u64,
    user_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRow> for LeaveRequest {
    type Error = StoreError;

    fn try_from(row: LeaveRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            id: row.id,
            user: row.user_id,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: parse_reason(&row.reason)?,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

fn parse_reason(raw: &str) -> Result<LeaveReason, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown leave reason '{raw}'")))
}

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn mark_meal(
        &self,
        user: u64,
        date: NaiveDate,
        meal: Meal,
    ) -> Result<AttendanceRecord, StoreError> {
        let presence = MealPresence::only(meal);
        let mut tx = self.pool.begin().await?;

        // OR keeps meals already recorded for the day
        sqlx::query(
            r#"
            INSERT INTO attendance_records (user_id, date, breakfast, lunch, dinner)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                breakfast = breakfast OR VALUES(breakfast),
                lunch = lunch OR VALUES(lunch),
                dinner = dinner OR VALUES(dinner)
            "#,
        )
        .bind(user)
        .bind(date)
        .bind(presence.breakfast)
        .bind(presence.lunch)
        .bind(presence.dinner)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "{SELECT_RECORD} WHERE user_id = ? AND date = ?"
        ))
        .bind(user)
        .bind(date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn register_leave(&self, leave: &NewLeave) -> Result<LeaveRequest, StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO leave_requests (user_id, start_date, end_date, reason, description)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(leave.user)
        .bind(leave.start_date)
        .bind(leave.end_date)
        .bind(leave.reason.as_ref())
        .bind(leave.description.as_deref())
        .execute(&mut *tx)
        .await?;

        // One upsert per day, ascending, so overlapping registrations lock
        // rows in the same order.
        for date in DateRange::new(leave.start_date, leave.end_date) {
            sqlx::query(
                r#"
                INSERT INTO attendance_records (user_id, date, is_on_leave, leave_reason)
                VALUES (?, ?, TRUE, ?)
                ON DUPLICATE KEY UPDATE
                    is_on_leave = TRUE,
                    leave_reason = VALUES(leave_reason)
                "#,
            )
            .bind(leave.user)
            .bind(date)
            .bind(leave.reason.as_ref())
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query_as::<_, LeaveRow>(&format!("{SELECT_LEAVE} WHERE id = ?"))
            .bind(inserted.last_insert_id())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        row.try_into()
    }

    async fn records_between(
        &self,
        user: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "{SELECT_RECORD} WHERE user_id = ? AND date BETWEEN ? AND ? ORDER BY date ASC"
        ))
        .bind(user)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }

    async fn leaves_for(&self, user: u64) -> Result<Vec<LeaveRequest>, StoreError> {
        let rows = sqlx::query_as::<_, LeaveRow>(&format!(
            "{SELECT_LEAVE} WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LeaveRequest::try_from).collect()
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"INSERT INTO users (username, password, role_id) VALUES (?, ?, ?)"#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role.id())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn touch_last_login(&self, user_id: u64) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_refresh_token(&self, jti: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE jti = ?
            AND revoked = FALSE
            AND expires_at > NOW()
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
