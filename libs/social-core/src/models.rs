use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub city: String,
    pub bio: String,
    #[serde(default)]
    pub interests: Vec<String>,
    pub photo_url: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
        }
    }
}

/// Directed connection request. At most one pending request may exist per
/// (sender, receiver) ordered pair; declined requests are deleted outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    /// Sender's username at send time, denormalized for display.
    pub sender_username: String,
    pub status: RequestStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Established, undirected link. Positions are storage artifacts only;
/// A-B and B-A are the same connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn involves(&self, user: Uuid) -> bool {
        self.user_a == user || self.user_b == user
    }

    /// The other member, given one member of the pair.
    pub fn counterpart(&self, user: Uuid) -> Option<Uuid> {
        if self.user_a == user {
            Some(self.user_b)
        } else if self.user_b == user {
            Some(self.user_a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
}

/// Immutable once created except the `read` flag, which only the
/// receiver's read action flips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub media: Option<MediaRef>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counterpart_works_from_either_position() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let conn = Connection {
            id: Uuid::new_v4(),
            user_a: a,
            user_b: b,
            created_at: Utc::now(),
        };

        assert_eq!(conn.counterpart(a), Some(b));
        assert_eq!(conn.counterpart(b), Some(a));
        assert_eq!(conn.counterpart(Uuid::new_v4()), None);
        assert!(conn.involves(a) && conn.involves(b));
    }

    #[test]
    fn request_status_round_trips_through_serde() {
        let json = serde_json::to_value(RequestStatus::Pending).expect("serialize");
        assert_eq!(json, "pending");
        let back: RequestStatus = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, RequestStatus::Pending);
    }
}
