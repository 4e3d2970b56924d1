use chrono::Utc;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::attendance::AttendanceApi;
use crate::error::ClientError;
use crate::leave::LeaveApi;
use crate::session::{Session, TokenPair};

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct Registered {
    id: u64,
}

/// Entry point. `base_url` includes the API prefix,
/// e.g. `http://localhost:8080/api`.
#[derive(Debug, Clone)]
pub struct MessClient {
    http: reqwest::Client,
    base_url: String,
}

impl MessClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    pub fn with_http_client(
        base_url: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn attendance(&self) -> AttendanceApi<'_> {
        AttendanceApi::new(self)
    }

    pub fn leave(&self) -> LeaveApi<'_> {
        LeaveApi::new(self)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    /// Creates a student account and returns its id.
    pub async fn register(&self, username: &str, password: &str) -> Result<u64, ClientError> {
        let request = self
            .post("/auth/register")
            .json(&json!({ "username": username, "password": password }));
        let registered: Registered = self.send_json(request).await?;
        Ok(registered.id)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        let request = self
            .post("/auth/login")
            .json(&json!({ "username": username, "password": password }));
        let pair: TokenPair = self.send_json(request).await?;
        debug!(username, "Signed in");
        Ok(Session::from_token_pair(username, pair, Utc::now()))
    }

    /// Rotates the refresh token and replaces both tokens in `session`.
    pub async fn refresh(&self, session: &mut Session) -> Result<(), ClientError> {
        let request = self
            .post("/auth/refresh")
            .bearer_auth(session.refresh_token());
        let pair: TokenPair = match self.send_json(request).await {
            Ok(pair) => pair,
            Err(ClientError::Api { status: 401, .. }) => return Err(ClientError::SessionExpired),
            Err(e) => return Err(e),
        };
        session.replace_tokens(pair, Utc::now());
        debug!(username = session.username(), "Session refreshed");
        Ok(())
    }

    /// Refreshes `session` if its access token is about to expire.
    pub async fn ensure_fresh(&self, session: &mut Session) -> Result<(), ClientError> {
        if session.needs_refresh(Utc::now()) {
            self.refresh(session).await?;
        }
        Ok(())
    }

    /// Revokes the refresh token. Consumes the session.
    pub async fn logout(&self, session: Session) -> Result<(), ClientError> {
        let response = self
            .post("/auth/logout")
            .bearer_auth(session.refresh_token())
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    /// Sends `request` with a fresh access token.
    pub(crate) async fn send_authed<T: DeserializeOwned>(
        &self,
        session: &mut Session,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        self.ensure_fresh(session).await?;
        self.send_json(request.bearer_auth(session.access_token()))
            .await
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| fallback_message(status, &body));

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        body.trim().to_string()
    }
}
