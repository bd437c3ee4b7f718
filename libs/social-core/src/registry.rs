use std::sync::Arc;

use chrono::{DateTime, Utc};
use remote_store::{to_document, Collection, Filter, Order, Store};
use uuid::Uuid;

use crate::error::{SocialError, SocialResult};
use crate::models::{Connection, Profile};
use crate::session::Session;

/// Matches the unordered pair in either column order.
pub(crate) fn pair_filter(a: Uuid, b: Uuid) -> Filter {
    Filter::any(vec![
        Filter::all(vec![
            Filter::eq("user_a", a.to_string()),
            Filter::eq("user_b", b.to_string()),
        ]),
        Filter::all(vec![
            Filter::eq("user_a", b.to_string()),
            Filter::eq("user_b", a.to_string()),
        ]),
    ])
}

pub(crate) async fn find_connection(
    store: &dyn Store,
    a: Uuid,
    b: Uuid,
) -> SocialResult<Option<Connection>> {
    let records = store
        .query(Collection::Connections, pair_filter(a, b), None)
        .await?;
    match records.first() {
        Some(record) => Ok(Some(record.decode()?)),
        None => Ok(None),
    }
}

/// Insert the link for the pair unless it already exists. The pair, not
/// the row, is the unit of consistency: a repeated call is a no-op, so an
/// accept replayed after a partial failure cannot create duplicates.
pub(crate) async fn ensure_connection(
    store: &dyn Store,
    a: Uuid,
    b: Uuid,
) -> SocialResult<(Connection, bool)> {
    if let Some(existing) = find_connection(store, a, b).await? {
        return Ok((existing, false));
    }

    let connection = Connection {
        id: Uuid::new_v4(),
        user_a: a,
        user_b: b,
        created_at: Utc::now(),
    };
    store
        .insert(Collection::Connections, to_document(&connection)?)
        .await?;
    Ok((connection, true))
}

/// One established link as seen from the session user's side.
#[derive(Debug, Clone)]
pub struct ConnectionPeer {
    pub connection_id: Uuid,
    pub peer: Profile,
    pub connected_at: DateTime<Utc>,
}

pub struct ConnectionRegistry {
    session: Arc<Session>,
}

impl ConnectionRegistry {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Enumerate the session user's connections, resolving the counterpart
    /// profile for each. Best-effort: a row whose counterpart profile
    /// cannot be resolved is logged and skipped, never aborting the whole
    /// listing.
    pub async fn list(&self) -> SocialResult<Vec<ConnectionPeer>> {
        let me = self.session.user_id();
        let store = self.session.store();

        let touching_me = Filter::any(vec![
            Filter::eq("user_a", me.to_string()),
            Filter::eq("user_b", me.to_string()),
        ]);
        let records = store
            .query(
                Collection::Connections,
                touching_me,
                Some(Order::Desc("created_at".to_string())),
            )
            .await?;

        let mut peers = Vec::with_capacity(records.len());
        for record in &records {
            let connection: Connection = record.decode()?;
            let Some(counterpart) = connection.counterpart(me) else {
                tracing::warn!(
                    component = "registry",
                    connection_id = %connection.id,
                    "connection row does not touch the session user, skipping"
                );
                continue;
            };

            match resolve_profile(store.as_ref(), counterpart).await {
                Ok(Some(peer)) => peers.push(ConnectionPeer {
                    connection_id: connection.id,
                    peer,
                    connected_at: connection.created_at,
                }),
                Ok(None) => {
                    tracing::warn!(
                        component = "registry",
                        connection_id = %connection.id,
                        counterpart = %counterpart,
                        "counterpart profile missing, skipping connection"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        component = "registry",
                        connection_id = %connection.id,
                        counterpart = %counterpart,
                        %error,
                        "counterpart profile lookup failed, skipping connection"
                    );
                }
            }
        }

        Ok(peers)
    }

    /// Unconditional delete. Messages between the pair remain; the gate
    /// rejects future sends because the link is gone.
    pub async fn disconnect(&self, connection_id: Uuid) -> SocialResult<()> {
        let deleted = self
            .session
            .store()
            .delete(
                Collection::Connections,
                Filter::eq("id", connection_id.to_string()),
            )
            .await?;

        if deleted == 0 {
            return Err(SocialError::ConnectionNotFound);
        }

        tracing::info!(
            component = "registry",
            connection_id = %connection_id,
            user_id = %self.session.user_id(),
            "connection removed"
        );
        Ok(())
    }
}

async fn resolve_profile(store: &dyn Store, user_id: Uuid) -> SocialResult<Option<Profile>> {
    let records = store
        .query(
            Collection::Profiles,
            Filter::eq("id", user_id.to_string()),
            None,
        )
        .await?;
    match records.first() {
        Some(record) => Ok(Some(record.decode()?)),
        None => Ok(None),
    }
}
