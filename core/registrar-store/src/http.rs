//! REST implementation of [`RemoteStore`].
//!
//! Talks to the record API over plain JSON:
//! `GET /{collection}`, `GET /{collection}/{id}`, `POST /{collection}`,
//! `PUT /{collection}/{id}`, `DELETE /{collection}/{id}`.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{RemoteStore, StoreOp};
use async_trait::async_trait;
use registrar_types::{EntityId, EntityKind, Record};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, warn};

/// Store backed by the REST API.
pub struct HttpStore {
    config: StoreConfig,
    client: Client,
}

impl HttpStore {
    /// Creates a new REST store.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Returns the configuration this store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn collection_url(&self, kind: EntityKind) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            kind.collection()
        )
    }

    fn record_url(&self, kind: EntityKind, id: &EntityId) -> String {
        format!(
            "{}/{}",
            self.collection_url(kind),
            urlencoding::encode(id.as_str())
        )
    }

    /// Maps a non-success response onto the error taxonomy.
    async fn check(
        response: Response,
        op: StoreOp,
        kind: EntityKind,
        id: Option<&EntityId>,
    ) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("{op} {kind} failed with HTTP {status}");

        Err(match (status, id) {
            (StatusCode::NOT_FOUND, Some(id)) => StoreError::NotFound {
                kind,
                id: id.clone(),
            },
            (StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY, _) => {
                StoreError::ValidationRejected(if body.is_empty() {
                    status.to_string()
                } else {
                    body
                })
            }
            _ => StoreError::Transient(format!("HTTP {status}: {body}")),
        })
    }

    async fn read_json(response: Response) -> StoreResult<serde_json::Value> {
        response
            .json()
            .await
            .map_err(|e| StoreError::Transient(format!("unreadable response body: {e}")))
    }
}

fn transport_error(op: StoreOp, kind: EntityKind, e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Transient(format!("{op} {kind} timed out"))
    } else {
        StoreError::Transient(format!("{op} {kind} request failed: {e}"))
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    fn backend_name(&self) -> &'static str {
        "http"
    }

    async fn list_all(&self, kind: EntityKind) -> StoreResult<Vec<Record>> {
        debug!("GET {}", self.collection_url(kind));

        let response = self
            .client
            .get(self.collection_url(kind))
            .send()
            .await
            .map_err(|e| transport_error(StoreOp::List, kind, e))?;
        let response = Self::check(response, StoreOp::List, kind, None).await?;

        let values: Vec<serde_json::Value> =
            match Self::read_json(response).await? {
                serde_json::Value::Array(items) => items,
                serde_json::Value::Null => Vec::new(),
                other => {
                    return Err(StoreError::Transient(format!(
                        "expected a JSON array of {}, got {}",
                        kind.collection(),
                        json_type(&other)
                    )));
                }
            };

        values
            .into_iter()
            .map(|v| Record::from_value(kind, v).map_err(StoreError::from))
            .collect()
    }

    async fn get_by_id(&self, kind: EntityKind, id: &EntityId) -> StoreResult<Record> {
        let url = self.record_url(kind, id);
        debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(StoreOp::Get, kind, e))?;
        let response = Self::check(response, StoreOp::Get, kind, Some(id)).await?;

        Ok(Record::from_value(kind, Self::read_json(response).await?)?)
    }

    async fn create(&self, mut record: Record) -> StoreResult<Record> {
        let kind = record.kind();
        record.set_id(None);
        debug!("POST {}", self.collection_url(kind));

        let response = self
            .client
            .post(self.collection_url(kind))
            .json(&record.to_value()?)
            .send()
            .await
            .map_err(|e| transport_error(StoreOp::Create, kind, e))?;
        let response = Self::check(response, StoreOp::Create, kind, None).await?;

        let created = Record::from_value(kind, Self::read_json(response).await?)?;
        if created.id().is_none() {
            return Err(StoreError::MissingId { kind });
        }
        Ok(created)
    }

    async fn update(&self, id: &EntityId, mut record: Record) -> StoreResult<Record> {
        let kind = record.kind();
        record.set_id(Some(id.clone()));
        let url = self.record_url(kind, id);
        debug!("PUT {url}");

        let response = self
            .client
            .put(url)
            .json(&record.to_value()?)
            .send()
            .await
            .map_err(|e| transport_error(StoreOp::Update, kind, e))?;
        let response = Self::check(response, StoreOp::Update, kind, Some(id)).await?;

        // Some deployments answer a PUT with an empty body.
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transient(format!("unreadable response body: {e}")))?;
        if body.trim().is_empty() {
            return Ok(record);
        }

        let mut updated = Record::from_value(kind, serde_json::from_str(&body)?)?;
        if updated.id().is_none() {
            updated.set_id(Some(id.clone()));
        }
        Ok(updated)
    }

    async fn delete(&self, kind: EntityKind, id: &EntityId) -> StoreResult<()> {
        let url = self.record_url(kind, id);
        debug!("DELETE {url}");

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| transport_error(StoreOp::Delete, kind, e))?;
        Self::check(response, StoreOp::Delete, kind, Some(id)).await?;
        Ok(())
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
