use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use crate::{Collection, Document, Filter, Order, Record, Store, StoreError};

/// HTTP client for the managed backend's document API.
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    token: Arc<RwLock<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    updated: u64,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    deleted: u64,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
            api_key,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Bearer token for the signed-in user; session management itself is
    /// external to this crate.
    pub async fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().await;
        *guard = token;
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.base_url.trim_end_matches('/'), path);
        let mut builder = self.client.request(method, url);

        if let Some(api_key) = &self.api_key {
            builder = builder.header("x-api-key", api_key);
        }
        if let Some(token) = self.token.read().await.clone() {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }

        builder
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(
                component = "store.rest",
                status = status.as_u16(),
                %message,
                "backend rejected request"
            );
            return Err(StoreError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl Store for RestStore {
    async fn insert(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<Record, StoreError> {
        let builder = self
            .request(Method::POST, collection.as_str())
            .await
            .json(&document);
        self.send(builder).await
    }

    async fn update(
        &self,
        collection: Collection,
        filter: Filter,
        patch: Document,
    ) -> Result<u64, StoreError> {
        let builder = self
            .request(Method::PATCH, collection.as_str())
            .await
            .json(&json!({ "filter": filter, "patch": patch }));
        let response: UpdateResponse = self.send(builder).await?;
        Ok(response.updated)
    }

    async fn delete(&self, collection: Collection, filter: Filter) -> Result<u64, StoreError> {
        let builder = self
            .request(Method::DELETE, collection.as_str())
            .await
            .json(&json!({ "filter": filter }));
        let response: DeleteResponse = self.send(builder).await?;
        Ok(response.deleted)
    }

    async fn query(
        &self,
        collection: Collection,
        filter: Filter,
        order: Option<Order>,
    ) -> Result<Vec<Record>, StoreError> {
        let builder = self
            .request(Method::POST, &format!("{}/query", collection.as_str()))
            .await
            .json(&json!({ "filter": filter, "order": order }));
        self.send(builder).await
    }
}
