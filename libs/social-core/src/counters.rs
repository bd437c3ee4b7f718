use std::sync::Arc;

use remote_store::{Collection, Filter};

use crate::error::SocialResult;
use crate::models::RequestStatus;
use crate::session::Session;

/// Badge counts shown by the shell, refreshed by polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeSnapshot {
    pub unread_messages: u64,
    pub pending_requests: u64,
}

/// Derived read-only views over the request ledger and the conversation
/// store. Both counts are recomputed from scratch on every call; there is
/// no incremental maintenance.
pub struct Counters {
    session: Arc<Session>,
}

impl Counters {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Unread messages addressed to the session user, across all
    /// conversations.
    pub async fn unread_count(&self) -> SocialResult<u64> {
        let records = self
            .session
            .store()
            .query(
                Collection::Messages,
                Filter::all(vec![
                    Filter::eq("receiver_id", self.session.user_id().to_string()),
                    Filter::eq("read", false),
                ]),
                None,
            )
            .await?;
        Ok(records.len() as u64)
    }

    /// Pending connection requests addressed to the session user.
    pub async fn pending_request_count(&self) -> SocialResult<u64> {
        let records = self
            .session
            .store()
            .query(
                Collection::ConnectionRequests,
                Filter::all(vec![
                    Filter::eq("receiver_id", self.session.user_id().to_string()),
                    Filter::eq("status", RequestStatus::Pending.as_str()),
                ]),
                None,
            )
            .await?;
        Ok(records.len() as u64)
    }

    pub async fn snapshot(&self) -> SocialResult<BadgeSnapshot> {
        Ok(BadgeSnapshot {
            unread_messages: self.unread_count().await?,
            pending_requests: self.pending_request_count().await?,
        })
    }
}
