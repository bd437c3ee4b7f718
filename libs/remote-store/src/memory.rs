use std::cmp::Ordering;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use crate::{Collection, Document, Filter, Order, Record, Store, StoreError};

/// In-process store used by tests and local runs. Plays the role of the
/// managed backend: no uniqueness constraints beyond what callers enforce.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<Collection, Vec<Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> Result<Record, StoreError> {
        let id = match document.remove("id") {
            Some(Value::String(id)) => id,
            Some(other) => other.to_string(),
            None => Uuid::new_v4().to_string(),
        };

        let record = Record {
            id,
            fields: document,
        };
        self.collections
            .entry(collection)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        filter: Filter,
        patch: Document,
    ) -> Result<u64, StoreError> {
        let mut affected = 0;
        if let Some(mut records) = self.collections.get_mut(&collection) {
            for record in records.iter_mut() {
                if filter.matches(record) {
                    for (field, value) in &patch {
                        record.fields.insert(field.clone(), value.clone());
                    }
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn delete(&self, collection: Collection, filter: Filter) -> Result<u64, StoreError> {
        let mut removed = 0;
        if let Some(mut records) = self.collections.get_mut(&collection) {
            let before = records.len();
            records.retain(|record| !filter.matches(record));
            removed = (before - records.len()) as u64;
        }
        Ok(removed)
    }

    async fn query(
        &self,
        collection: Collection,
        filter: Filter,
        order: Option<Order>,
    ) -> Result<Vec<Record>, StoreError> {
        let mut results: Vec<Record> = self
            .collections
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| filter.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            // Stable sort: equal keys keep insertion order.
            results.sort_by(|a, b| {
                let ordering = compare_values(a.get(order.field()), b.get(order.field()));
                if order.descending() {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(results)
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(a), Value::Number(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => Ordering::Equal,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        let Value::Object(map) = value else {
            panic!("document must be an object");
        };
        map
    }

    #[tokio::test]
    async fn insert_assigns_id_unless_supplied() {
        let store = MemoryStore::new();

        let assigned = store
            .insert(Collection::Profiles, doc(json!({ "username": "alice" })))
            .await
            .expect("insert");
        assert!(!assigned.id.is_empty());

        let supplied = store
            .insert(
                Collection::Profiles,
                doc(json!({ "id": "p-1", "username": "bob" })),
            )
            .await
            .expect("insert with id");
        assert_eq!(supplied.id, "p-1");
        assert!(supplied.get("id").is_none());
    }

    #[tokio::test]
    async fn update_patches_only_matches_and_reports_count() {
        let store = MemoryStore::new();
        for (user, status) in [("u1", "pending"), ("u2", "pending"), ("u1", "accepted")] {
            store
                .insert(
                    Collection::ConnectionRequests,
                    doc(json!({ "receiver_id": user, "status": status })),
                )
                .await
                .expect("insert");
        }

        let affected = store
            .update(
                Collection::ConnectionRequests,
                Filter::all(vec![
                    Filter::eq("receiver_id", "u1"),
                    Filter::eq("status", "pending"),
                ]),
                doc(json!({ "status": "accepted" })),
            )
            .await
            .expect("update");
        assert_eq!(affected, 1);

        let pending = store
            .query(
                Collection::ConnectionRequests,
                Filter::eq("status", "pending"),
                None,
            )
            .await
            .expect("query");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].get("receiver_id"), Some(&json!("u2")));
    }

    #[tokio::test]
    async fn delete_returns_zero_when_nothing_matches() {
        let store = MemoryStore::new();
        let removed = store
            .delete(Collection::Connections, Filter::eq("id", "missing"))
            .await
            .expect("delete");
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn query_orders_by_requested_field() {
        let store = MemoryStore::new();
        for (name, at) in [("b", 2), ("c", 3), ("a", 1)] {
            store
                .insert(
                    Collection::Messages,
                    doc(json!({ "content": name, "created_at": at })),
                )
                .await
                .expect("insert");
        }

        let ascending = store
            .query(
                Collection::Messages,
                Filter::all(vec![]),
                Some(Order::Asc("created_at".to_string())),
            )
            .await
            .expect("query asc");
        let contents: Vec<_> = ascending
            .iter()
            .map(|r| r.get("content").cloned())
            .collect();
        assert_eq!(contents, vec![Some(json!("a")), Some(json!("b")), Some(json!("c"))]);

        let descending = store
            .query(
                Collection::Messages,
                Filter::all(vec![]),
                Some(Order::Desc("created_at".to_string())),
            )
            .await
            .expect("query desc");
        assert_eq!(descending[0].get("content"), Some(&json!("c")));
    }
}
