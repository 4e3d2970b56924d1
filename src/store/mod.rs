//! Persistence seams. Handlers only see these traits; `main` decides which
//! backend sits behind them.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, Meal};
use crate::model::leave_request::{LeaveRequest, NewLeave};
use crate::model::role::Role;
use crate::model::user::User;

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Sets one meal flag on the (user, date) record, creating it if needed.
    async fn mark_meal(
        &self,
        user: u64,
        date: NaiveDate,
        meal: Meal,
    ) -> Result<AttendanceRecord, StoreError>;

    /// Stores the request and flags every day of its range as leave.
    /// All days are written or none are.
    async fn register_leave(&self, leave: &NewLeave) -> Result<LeaveRequest, StoreError>;

    /// Stored rows inside `[start, end]`, ascending by date. Days without a
    /// row are simply absent.
    async fn records_between(
        &self,
        user: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Leave history for a user, newest first.
    async fn leaves_for(&self, user: u64) -> Result<Vec<LeaveRequest>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the new user id, or [`StoreError::Conflict`] for a taken username.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<u64, StoreError>;

    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: u64) -> Result<Option<User>, StoreError>;

    async fn touch_last_login(&self, user_id: u64) -> Result<(), StoreError>;

    async fn store_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> Result<(), StoreError>;

    /// Revokes the token. `true` only if it was active until this call.
    async fn consume_refresh_token(&self, jti: &str) -> Result<bool, StoreError>;
}
