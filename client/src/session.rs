use chrono::{DateTime, Duration, Utc};

/// Refresh this long before the access token actually expires.
const EXPIRY_SKEW_SECS: i64 = 30;

/// Tokens of a signed-in user. Passed explicitly to every API call.
#[derive(Debug, Clone)]
pub struct Session {
    username: String,
    access_token: String,
    refresh_token: String,
    access_expires_at: DateTime<Utc>,
}

impl Session {
    /// Rebuilds a session, e.g. from tokens persisted by the caller.
    pub fn new(
        username: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        access_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            username: username.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            access_expires_at,
        }
    }

    pub(crate) fn from_token_pair(username: &str, pair: TokenPair, now: DateTime<Utc>) -> Self {
        Self::new(
            username,
            pair.access_token,
            pair.refresh_token,
            now + Duration::seconds(pair.expires_in),
        )
    }

    pub(crate) fn replace_tokens(&mut self, pair: TokenPair, now: DateTime<Utc>) {
        self.access_token = pair.access_token;
        self.refresh_token = pair.refresh_token;
        self.access_expires_at = now + Duration::seconds(pair.expires_in);
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    pub fn access_expires_at(&self) -> DateTime<Utc> {
        self.access_expires_at
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.access_expires_at
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}
