use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::{AttendanceStore, UserStore};
use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, Meal};
use crate::model::leave_request::{LeaveRequest, NewLeave};
use crate::model::role::Role;
use crate::model::user::User;
use crate::utils::dates::DateRange;

struct RefreshEntry {
    expires_at: i64,
    revoked: bool,
}

#[derive(Default)]
struct State {
    users: Vec<User>,
    refresh_tokens: HashMap<String, RefreshEntry>,
    records: BTreeMap<(u64, NaiveDate), AttendanceRecord>,
    leaves: Vec<LeaveRequest>,
}

/// In-process store for local runs and tests. Every operation holds a
/// single lock for its whole duration.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn mark_meal(
        &self,
        user: u64,
        date: NaiveDate,
        meal: Meal,
    ) -> Result<AttendanceRecord, StoreError> {
        let mut state = self.lock()?;
        let record = state
            .records
            .entry((user, date))
            .or_insert_with(|| AttendanceRecord::empty(user, date));
        record.meals.mark(meal);
        Ok(record.clone())
    }

    async fn register_leave(&self, leave: &NewLeave) -> Result<LeaveRequest, StoreError> {
        let mut state = self.lock()?;

        for date in DateRange::new(leave.start_date, leave.end_date) {
            let record = state
                .records
                .entry((leave.user, date))
                .or_insert_with(|| AttendanceRecord::empty(leave.user, date));
            record.is_on_leave = true;
            record.leave_reason = Some(leave.reason);
        }

        let request = LeaveRequest {
            id: state.leaves.len() as u64 + 1,
            user: leave.user,
            start_date: leave.start_date,
            end_date: leave.end_date,
            reason: leave.reason,
            description: leave.description.clone(),
            created_at: Utc::now(),
        };
        state.leaves.push(request.clone());
        Ok(request)
    }

    async fn records_between(
        &self,
        user: u64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        if start > end {
            return Ok(Vec::new());
        }
        let state = self.lock()?;
        Ok(state
            .records
            .range((user, start)..=(user, end))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn leaves_for(&self, user: u64) -> Result<Vec<LeaveRequest>, StoreError> {
        let state = self.lock()?;
        // ids grow with insertion order, so reversing gives newest first
        Ok(state
            .leaves
            .iter()
            .rev()
            .filter(|l| l.user == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<u64, StoreError> {
        let mut state = self.lock()?;
        if state.users.iter().any(|u| u.username == username) {
            return Err(StoreError::Conflict);
        }
        let id = state.users.len() as u64 + 1;
        state.users.push(User {
            id,
            username: username.to_string(),
            password: password_hash.to_string(),
            role_id: role.id(),
            is_active: true,
        });
        Ok(id)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
        let state = self.lock()?;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn touch_last_login(&self, _user_id: u64) -> Result<(), StoreError> {
        Ok(())
    }

    async fn store_refresh_token(
        &self,
        _user_id: u64,
        jti: &str,
        expires_at: i64,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.refresh_tokens.contains_key(jti) {
            return Err(StoreError::Conflict);
        }
        state.refresh_tokens.insert(
            jti.to_string(),
            RefreshEntry {
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn consume_refresh_token(&self, jti: &str) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now().timestamp();
        match state.refresh_tokens.get_mut(jti) {
            Some(entry) if !entry.revoked && entry.expires_at > now => {
                entry.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
