use std::sync::Arc;

use chrono::Utc;
use remote_store::{to_document, Collection, Filter, Order};
use serde_json::{json, Value};
use uuid::Uuid;

use super::cache::ConversationCache;
use super::gate;
use crate::error::{SocialError, SocialResult};
use crate::models::{MediaRef, Message};
use crate::session::Session;
use crate::sync::SendGuard;
use crate::validation::validate_message_body;

fn conversation_filter(me: Uuid, other: Uuid) -> Filter {
    Filter::any(vec![
        Filter::all(vec![
            Filter::eq("sender_id", me.to_string()),
            Filter::eq("receiver_id", other.to_string()),
        ]),
        Filter::all(vec![
            Filter::eq("sender_id", other.to_string()),
            Filter::eq("receiver_id", me.to_string()),
        ]),
    ])
}

/// Direct messaging between connected users. Every send and every
/// conversation read passes the authorization gate first; a sent message
/// is appended optimistically to the local cache and retracted if the
/// remote write is confirmed failed. Nothing here retries: the caller
/// resubmits after an error.
pub struct MessagingService {
    session: Arc<Session>,
    cache: ConversationCache,
    send_guard: SendGuard,
}

impl MessagingService {
    pub async fn new(session: Arc<Session>) -> SocialResult<Self> {
        let cache_path = session.config().cache_path(session.user_id());
        Ok(Self {
            cache: ConversationCache::open(cache_path).await?,
            send_guard: SendGuard::new(),
            session,
        })
    }

    /// Handle for the conversation poller: rounds are skipped while a
    /// send is in flight.
    pub fn send_guard(&self) -> SendGuard {
        self.send_guard.clone()
    }

    pub async fn send(
        &self,
        receiver_id: Uuid,
        content: impl Into<String>,
        media: Option<MediaRef>,
    ) -> SocialResult<Message> {
        let me = self.session.user_id();
        let store = self.session.store();

        if !gate::authorize(store.as_ref(), me, receiver_id).await? {
            return Err(SocialError::NotConnected);
        }

        let content = content.into();
        validate_message_body(&content, media.is_some())
            .map_err(|e| SocialError::Validation(e.to_string()))?;

        let message = Message {
            id: Uuid::new_v4(),
            sender_id: me,
            receiver_id,
            content,
            media,
            created_at: Utc::now(),
            read: false,
        };

        let _in_flight = self.send_guard.begin();
        self.cache.store_pending(&message).await?;

        match store
            .insert(Collection::Messages, to_document(&message)?)
            .await
        {
            Ok(record) => {
                let sent: Message = record.decode()?;
                self.cache.store_sent(&sent).await?;
                tracing::info!(
                    component = "messaging",
                    message_id = %sent.id,
                    receiver_id = %receiver_id,
                    "message persisted"
                );
                Ok(sent)
            }
            Err(error) => {
                // Confirmed failure: retract the optimistic append so the
                // local view matches the authoritative store.
                if let Err(cache_error) = self.cache.retract_pending(message.id).await {
                    tracing::warn!(
                        component = "messaging",
                        message_id = %message.id,
                        %cache_error,
                        "failed to retract optimistic append"
                    );
                }
                tracing::warn!(
                    component = "messaging",
                    receiver_id = %receiver_id,
                    %error,
                    "message send failed"
                );
                Err(error.into())
            }
        }
    }

    /// Full history with the other user, oldest first. As part of this
    /// read, every unread message addressed to the session user from
    /// `other` is marked read; the caller's own unread state elsewhere is
    /// untouched. Still-unconfirmed local appends are merged into the
    /// returned list.
    pub async fn conversation(&self, other: Uuid) -> SocialResult<Vec<Message>> {
        let me = self.session.user_id();
        let store = self.session.store();

        if !gate::authorize(store.as_ref(), me, other).await? {
            return Err(SocialError::NotConnected);
        }

        let records = store
            .query(
                Collection::Messages,
                conversation_filter(me, other),
                Some(Order::Asc("created_at".to_string())),
            )
            .await?;

        let mut messages = Vec::with_capacity(records.len());
        for record in &records {
            messages.push(record.decode::<Message>()?);
        }

        let read_patch = match json!({ "read": true }) {
            Value::Object(map) => map,
            _ => unreachable!("patch literal is an object"),
        };
        let marked = store
            .update(
                Collection::Messages,
                Filter::all(vec![
                    Filter::eq("sender_id", other.to_string()),
                    Filter::eq("receiver_id", me.to_string()),
                    Filter::eq("read", false),
                ]),
                read_patch,
            )
            .await?;
        if marked > 0 {
            for message in &mut messages {
                if message.receiver_id == me {
                    message.read = true;
                }
            }
            tracing::debug!(
                component = "messaging",
                other = %other,
                marked,
                "marked conversation read"
            );
        }

        self.cache.mirror(&messages).await?;

        let pending = self.cache.pending_between(me, other).await?;
        for local in pending {
            if !messages.iter().any(|m| m.id == local.id) {
                messages.push(local);
            }
        }
        messages.sort_by_key(|m| m.created_at);

        Ok(messages)
    }

    /// Local echo of the last fetched history, served without a messages
    /// round-trip. The gate still applies.
    pub async fn cached_conversation(&self, other: Uuid) -> SocialResult<Vec<Message>> {
        let me = self.session.user_id();
        if !gate::authorize(self.session.store().as_ref(), me, other).await? {
            return Err(SocialError::NotConnected);
        }
        self.cache.conversation(me, other).await
    }
}
