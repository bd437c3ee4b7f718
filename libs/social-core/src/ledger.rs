use std::sync::Arc;

use chrono::Utc;
use remote_store::{to_document, Collection, Filter, Order};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{SocialError, SocialResult};
use crate::models::{Connection, ConnectionRequest, RequestStatus};
use crate::registry::{ensure_connection, find_connection};
use crate::session::Session;

fn accepted_patch() -> remote_store::Document {
    match json!({ "status": RequestStatus::Accepted }) {
        Value::Object(map) => map,
        _ => unreachable!("patch literal is an object"),
    }
}

/// The set of connection request records and their transitions:
/// none -> pending -> accepted (link established) or deleted on decline.
pub struct RequestLedger {
    session: Arc<Session>,
}

impl RequestLedger {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Send a connection request from the session user. Exactly one insert
    /// on success; the record snapshots the sender's current username.
    pub async fn send(&self, receiver_id: Uuid) -> SocialResult<ConnectionRequest> {
        let me = self.session.user_id();
        if receiver_id == me {
            return Err(SocialError::Validation(
                "cannot send a connection request to yourself".to_string(),
            ));
        }

        let store = self.session.store();

        let pending = store
            .query(
                Collection::ConnectionRequests,
                Filter::all(vec![
                    Filter::eq("sender_id", me.to_string()),
                    Filter::eq("receiver_id", receiver_id.to_string()),
                    Filter::eq("status", RequestStatus::Pending.as_str()),
                ]),
                None,
            )
            .await?;
        if !pending.is_empty() {
            return Err(SocialError::AlreadyRequested);
        }

        if find_connection(store.as_ref(), me, receiver_id).await?.is_some() {
            return Err(SocialError::AlreadyConnected);
        }

        let request = ConnectionRequest {
            id: Uuid::new_v4(),
            sender_id: me,
            receiver_id,
            sender_username: self.session.username().to_string(),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };
        store
            .insert(Collection::ConnectionRequests, to_document(&request)?)
            .await?;

        tracing::info!(
            component = "ledger",
            request_id = %request.id,
            receiver_id = %receiver_id,
            "connection request sent"
        );
        Ok(request)
    }

    /// Pending requests addressed to the session user, newest first.
    pub async fn list_incoming(&self) -> SocialResult<Vec<ConnectionRequest>> {
        let records = self
            .session
            .store()
            .query(
                Collection::ConnectionRequests,
                Filter::all(vec![
                    Filter::eq("receiver_id", self.session.user_id().to_string()),
                    Filter::eq("status", RequestStatus::Pending.as_str()),
                ]),
                Some(Order::Desc("created_at".to_string())),
            )
            .await?;

        records
            .iter()
            .map(|record| record.decode().map_err(SocialError::from))
            .collect()
    }

    /// Mark the request accepted and establish the link. The two writes
    /// are not atomic, but the second is guarded on the pair: replaying an
    /// accept never creates a duplicate connection, and a crash between
    /// the writes is repaired by [`RequestLedger::reconcile`].
    pub async fn accept(&self, request_id: Uuid) -> SocialResult<Connection> {
        let store = self.session.store();

        let records = store
            .query(
                Collection::ConnectionRequests,
                Filter::eq("id", request_id.to_string()),
                None,
            )
            .await?;
        let request: ConnectionRequest = match records.first() {
            Some(record) => record.decode()?,
            None => return Err(SocialError::RequestNotFound),
        };

        let updated = store
            .update(
                Collection::ConnectionRequests,
                Filter::eq("id", request_id.to_string()),
                accepted_patch(),
            )
            .await?;
        if updated == 0 {
            // Deleted between the read and the write.
            return Err(SocialError::RequestNotFound);
        }

        let (connection, created) =
            ensure_connection(store.as_ref(), request.sender_id, request.receiver_id).await?;

        tracing::info!(
            component = "ledger",
            request_id = %request_id,
            connection_id = %connection.id,
            link_created = created,
            "connection request accepted"
        );
        Ok(connection)
    }

    /// Remove the request outright; no decline history is retained, so the
    /// sender may immediately request again.
    pub async fn decline(&self, request_id: Uuid) -> SocialResult<()> {
        let deleted = self
            .session
            .store()
            .delete(
                Collection::ConnectionRequests,
                Filter::eq("id", request_id.to_string()),
            )
            .await?;
        if deleted == 0 {
            return Err(SocialError::RequestNotFound);
        }

        tracing::info!(
            component = "ledger",
            request_id = %request_id,
            "connection request declined"
        );
        Ok(())
    }

    /// Repair pass for the non-atomic accept: any accepted request
    /// touching the session user that lacks its connection gets the
    /// missing link inserted. Returns the number of repaired pairs.
    pub async fn reconcile(&self) -> SocialResult<u32> {
        let me = self.session.user_id();
        let store = self.session.store();

        let records = store
            .query(
                Collection::ConnectionRequests,
                Filter::all(vec![
                    Filter::eq("status", RequestStatus::Accepted.as_str()),
                    Filter::any(vec![
                        Filter::eq("sender_id", me.to_string()),
                        Filter::eq("receiver_id", me.to_string()),
                    ]),
                ]),
                None,
            )
            .await?;

        let mut repaired = 0;
        for record in &records {
            let request: ConnectionRequest = record.decode()?;
            let (connection, created) =
                ensure_connection(store.as_ref(), request.sender_id, request.receiver_id).await?;
            if created {
                repaired += 1;
                tracing::warn!(
                    component = "ledger",
                    request_id = %request.id,
                    connection_id = %connection.id,
                    "repaired accepted request without connection"
                );
            }
        }

        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionRegistry;
    use crate::testutil::{memory_store, signed_in};
    use remote_store::Store;

    #[tokio::test]
    async fn sent_request_shows_up_as_incoming_pending() {
        let store = memory_store();
        let alice = signed_in(&store, "alice").await;
        let bob = signed_in(&store, "bob").await;

        let request = RequestLedger::new(Arc::clone(&alice))
            .send(bob.user_id())
            .await
            .expect("send");
        assert_eq!(request.sender_username, "alice");
        assert_eq!(request.status, RequestStatus::Pending);

        let incoming = RequestLedger::new(Arc::clone(&bob))
            .list_incoming()
            .await
            .expect("incoming");
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].sender_id, alice.user_id());
        assert_eq!(incoming[0].sender_username, "alice");
    }

    #[tokio::test]
    async fn duplicate_pending_request_is_rejected() {
        let store = memory_store();
        let alice = signed_in(&store, "alice").await;
        let bob = signed_in(&store, "bob").await;

        let ledger = RequestLedger::new(Arc::clone(&alice));
        ledger.send(bob.user_id()).await.expect("first send");

        let err = ledger.send(bob.user_id()).await.expect_err("duplicate");
        assert!(matches!(err, SocialError::AlreadyRequested));
    }

    #[tokio::test]
    async fn self_request_is_rejected() {
        let store = memory_store();
        let alice = signed_in(&store, "alice").await;

        let err = RequestLedger::new(Arc::clone(&alice))
            .send(alice.user_id())
            .await
            .expect_err("self request");
        assert!(matches!(err, SocialError::Validation(_)));
    }

    #[tokio::test]
    async fn accept_links_both_sides_and_blocks_re_request() {
        let store = memory_store();
        let alice = signed_in(&store, "alice").await;
        let bob = signed_in(&store, "bob").await;

        let request = RequestLedger::new(Arc::clone(&alice))
            .send(bob.user_id())
            .await
            .expect("send");
        RequestLedger::new(Arc::clone(&bob))
            .accept(request.id)
            .await
            .expect("accept");

        let alice_peers = ConnectionRegistry::new(Arc::clone(&alice))
            .list()
            .await
            .expect("alice peers");
        assert_eq!(alice_peers.len(), 1);
        assert_eq!(alice_peers[0].peer.username, "bob");

        let bob_peers = ConnectionRegistry::new(Arc::clone(&bob))
            .list()
            .await
            .expect("bob peers");
        assert_eq!(bob_peers.len(), 1);
        assert_eq!(bob_peers[0].peer.username, "alice");

        let err = RequestLedger::new(Arc::clone(&alice))
            .send(bob.user_id())
            .await
            .expect_err("already linked");
        assert!(matches!(err, SocialError::AlreadyConnected));
    }

    #[tokio::test]
    async fn accept_of_unknown_request_fails() {
        let store = memory_store();
        let alice = signed_in(&store, "alice").await;

        let err = RequestLedger::new(Arc::clone(&alice))
            .accept(Uuid::new_v4())
            .await
            .expect_err("missing request");
        assert!(matches!(err, SocialError::RequestNotFound));
    }

    #[tokio::test]
    async fn replayed_accept_does_not_duplicate_the_link() {
        let store = memory_store();
        let alice = signed_in(&store, "alice").await;
        let bob = signed_in(&store, "bob").await;

        let request = RequestLedger::new(Arc::clone(&alice))
            .send(bob.user_id())
            .await
            .expect("send");

        let ledger = RequestLedger::new(Arc::clone(&bob));
        let first = ledger.accept(request.id).await.expect("first accept");
        let second = ledger.accept(request.id).await.expect("replayed accept");
        assert_eq!(first.id, second.id);

        let peers = ConnectionRegistry::new(Arc::clone(&alice))
            .list()
            .await
            .expect("peers");
        assert_eq!(peers.len(), 1);
    }

    #[tokio::test]
    async fn second_decline_fails_instead_of_silently_succeeding() {
        let store = memory_store();
        let alice = signed_in(&store, "alice").await;
        let bob = signed_in(&store, "bob").await;

        let request = RequestLedger::new(Arc::clone(&alice))
            .send(bob.user_id())
            .await
            .expect("send");

        let ledger = RequestLedger::new(Arc::clone(&bob));
        ledger.decline(request.id).await.expect("decline");

        let err = ledger
            .decline(request.id)
            .await
            .expect_err("already removed");
        assert!(matches!(err, SocialError::RequestNotFound));

        // Decline leaves no tombstone: an immediate re-request is allowed.
        RequestLedger::new(Arc::clone(&alice))
            .send(bob.user_id())
            .await
            .expect("re-request after decline");
    }

    #[tokio::test]
    async fn reconcile_repairs_accepted_request_without_connection() {
        let store = memory_store();
        let alice = signed_in(&store, "alice").await;
        let bob = signed_in(&store, "bob").await;

        // Simulate a crash between the two accept writes: the request is
        // marked accepted but the connection insert never happened.
        let stranded = ConnectionRequest {
            id: Uuid::new_v4(),
            sender_id: alice.user_id(),
            receiver_id: bob.user_id(),
            sender_username: "alice".to_string(),
            status: RequestStatus::Accepted,
            created_at: Utc::now(),
        };
        store
            .insert(
                Collection::ConnectionRequests,
                to_document(&stranded).expect("document"),
            )
            .await
            .expect("seed stranded request");

        let repaired = RequestLedger::new(Arc::clone(&bob))
            .reconcile()
            .await
            .expect("reconcile");
        assert_eq!(repaired, 1);

        let peers = ConnectionRegistry::new(Arc::clone(&alice))
            .list()
            .await
            .expect("peers");
        assert_eq!(peers.len(), 1);

        // A second pass finds nothing left to repair.
        let again = RequestLedger::new(Arc::clone(&bob))
            .reconcile()
            .await
            .expect("reconcile again");
        assert_eq!(again, 0);
    }
}
