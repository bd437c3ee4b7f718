pub mod error;
pub mod filter;
pub mod memory;
pub mod rest;

use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use error::StoreError;
pub use filter::{Filter, Order};
pub use memory::MemoryStore;
pub use rest::RestStore;

/// Collections recognized by the managed backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Profiles,
    ConnectionRequests,
    Connections,
    Messages,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Profiles => "profiles",
            Collection::ConnectionRequests => "connection_requests",
            Collection::Connections => "connections",
            Collection::Messages => "messages",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field map of a record, excluding its id.
pub type Document = serde_json::Map<String, Value>;

/// A stored record: backend-assigned (or client-supplied) id plus fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(flatten)]
    pub fields: Document,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Decode the record (id included) into a typed model.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Serialize a typed model into an insertable document. A string `id`
/// field, if present, is kept and honored by implementations.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Serialization(serde::de::Error::custom(
            format!("expected object document, got {other}"),
        ))),
    }
}

/// Abstract contract of the external managed store. Implementations must
/// not reinterpret failures; callers receive them as opaque [`StoreError`]s.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert(&self, collection: Collection, document: Document)
        -> Result<Record, StoreError>;

    /// Applies `patch` to every matching record, returns the match count.
    async fn update(
        &self,
        collection: Collection,
        filter: Filter,
        patch: Document,
    ) -> Result<u64, StoreError>;

    /// Removes every matching record, returns the removed count.
    async fn delete(&self, collection: Collection, filter: Filter) -> Result<u64, StoreError>;

    async fn query(
        &self,
        collection: Collection,
        filter: Filter,
        order: Option<Order>,
    ) -> Result<Vec<Record>, StoreError>;
}
