use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use uuid::Uuid;

use crate::error::{SocialError, SocialResult};
use crate::models::{MediaKind, MediaRef, Message};

const STATUS_SENDING: &str = "sending";
const STATUS_SENT: &str = "sent";

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: String,
    sender_id: String,
    receiver_id: String,
    content: String,
    media_url: Option<String>,
    media_kind: Option<String>,
    created_at: i64,
    read_flag: bool,
}

impl MessageRow {
    fn into_message(self) -> SocialResult<Message> {
        let parse = |value: &str| {
            Uuid::parse_str(value).map_err(|e| {
                SocialError::Validation(format!("corrupt cached user id {value}: {e}"))
            })
        };

        let media = match (self.media_url, self.media_kind.as_deref()) {
            (Some(url), Some("image")) => Some(MediaRef {
                url,
                kind: MediaKind::Image,
            }),
            (Some(url), Some("video")) => Some(MediaRef {
                url,
                kind: MediaKind::Video,
            }),
            _ => None,
        };

        Ok(Message {
            id: parse(&self.id)?,
            sender_id: parse(&self.sender_id)?,
            receiver_id: parse(&self.receiver_id)?,
            content: self.content,
            media,
            created_at: DateTime::<Utc>::from_timestamp_millis(self.created_at)
                .unwrap_or_default(),
            read: self.read_flag,
        })
    }
}

/// Per-user sqlite mirror of conversation history plus the optimistic
/// overlay: rows in `sending` state are local appends that the remote
/// store has not confirmed yet.
#[derive(Clone)]
pub struct ConversationCache {
    pool: SqlitePool,
}

impl ConversationCache {
    pub async fn open(db_path: PathBuf) -> SocialResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let cache = Self { pool };
        cache.init_schema().await?;
        Ok(cache)
    }

    async fn init_schema(&self) -> SocialResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_messages (
                id TEXT PRIMARY KEY,
                sender_id TEXT NOT NULL,
                receiver_id TEXT NOT NULL,
                content TEXT NOT NULL,
                media_url TEXT,
                media_kind TEXT,
                created_at INTEGER NOT NULL,
                read_flag INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_local_messages_pair_time \
             ON local_messages(sender_id, receiver_id, created_at ASC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert(&self, message: &Message, status: &str) -> SocialResult<()> {
        let (media_url, media_kind) = match &message.media {
            Some(media) => (Some(media.url.clone()), Some(media.kind.as_str())),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO local_messages (
                id, sender_id, receiver_id, content, media_url, media_kind,
                created_at, read_flag, status
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                media_url = excluded.media_url,
                media_kind = excluded.media_kind,
                created_at = excluded.created_at,
                read_flag = excluded.read_flag,
                status = excluded.status,
                updated_at = datetime('now')
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.sender_id.to_string())
        .bind(message.receiver_id.to_string())
        .bind(&message.content)
        .bind(media_url)
        .bind(media_kind)
        .bind(message.created_at.timestamp_millis())
        .bind(message.read)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record an optimistic local append before the remote insert.
    pub async fn store_pending(&self, message: &Message) -> SocialResult<()> {
        self.upsert(message, STATUS_SENDING).await
    }

    /// Replace the pending row with the confirmed authoritative copy.
    pub async fn store_sent(&self, message: &Message) -> SocialResult<()> {
        self.upsert(message, STATUS_SENT).await
    }

    /// Retract an optimistic append whose remote write is confirmed
    /// failed. Confirmed rows are never retracted through this path.
    pub async fn retract_pending(&self, message_id: Uuid) -> SocialResult<()> {
        sqlx::query("DELETE FROM local_messages WHERE id = ? AND status = ?")
            .bind(message_id.to_string())
            .bind(STATUS_SENDING)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Mirror authoritative rows fetched from the remote store.
    pub async fn mirror(&self, messages: &[Message]) -> SocialResult<()> {
        for message in messages {
            self.store_sent(message).await?;
        }
        Ok(())
    }

    /// Optimistic appends between the pair that are still awaiting
    /// confirmation.
    pub async fn pending_between(&self, a: Uuid, b: Uuid) -> SocialResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender_id, receiver_id, content, media_url, media_kind,
                   created_at, read_flag
            FROM local_messages
            WHERE status = ?
              AND ((sender_id = ? AND receiver_id = ?)
                OR (sender_id = ? AND receiver_id = ?))
            ORDER BY created_at ASC
            "#,
        )
        .bind(STATUS_SENDING)
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(b.to_string())
        .bind(a.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }

    /// Last locally known history for the pair, pending rows included.
    pub async fn conversation(&self, a: Uuid, b: Uuid) -> SocialResult<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, sender_id, receiver_id, content, media_url, media_kind,
                   created_at, read_flag
            FROM local_messages
            WHERE (sender_id = ? AND receiver_id = ?)
               OR (sender_id = ? AND receiver_id = ?)
            ORDER BY created_at ASC
            "#,
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(b.to_string())
        .bind(a.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }
}
