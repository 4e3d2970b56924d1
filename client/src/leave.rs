use serde::Deserialize;

use crate::client::MessClient;
use crate::error::ClientError;
use crate::session::Session;
use crate::types::{DataEnvelope, Leave, LeaveRegistration};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaveCreated {
    data: Leave,
}

/// `/attendance/leave` endpoints.
pub struct LeaveApi<'a> {
    client: &'a MessClient,
}

impl<'a> LeaveApi<'a> {
    pub(crate) fn new(client: &'a MessClient) -> Self {
        Self { client }
    }

    /// Registers leave; takes effect immediately.
    pub async fn register(
        &self,
        session: &mut Session,
        leave: &LeaveRegistration,
    ) -> Result<Leave, ClientError> {
        let request = self.client.post("/attendance/leave").json(leave);
        let created: LeaveCreated = self.client.send_authed(session, request).await?;
        Ok(created.data)
    }

    /// Leave history, newest first.
    pub async fn history(&self, session: &mut Session) -> Result<Vec<Leave>, ClientError> {
        let request = self.client.get("/attendance/leave");
        let envelope: DataEnvelope<Vec<Leave>> =
            self.client.send_authed(session, request).await?;
        Ok(envelope.data)
    }
}
