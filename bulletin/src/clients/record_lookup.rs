use std::collections::BTreeSet;

use async_trait::async_trait;
use shared_types::{BrowseEvent, Record, RecordId, RECORD_FIELDS};

use crate::config::RecordStoreConfig;
use crate::error::{ConfigurationError, LookupError};

/// Batch lookup of descriptive records by id.
///
/// Ids without a matching record are simply absent from the result.
#[async_trait]
pub trait RecordLookupClient: Send + Sync {
    async fn lookup_by_ids(&self, ids: &BTreeSet<RecordId>) -> Result<Vec<Record>, LookupError>;
}

/// Browse analytics: remembers which item a user opened.
///
/// Called by presentation code when an item is opened, never by the
/// orchestrators.
#[async_trait]
pub trait BrowseRecorder: Send + Sync {
    async fn record_browse(&self, user_id: &str, record_id: &RecordId) -> Result<(), LookupError>;
}

/// PostgREST-backed record store.
///
/// Built from [`Config::record_store`](crate::config::Config::record_store);
/// when that is an error, every call fails with it before touching the network.
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    http: reqwest::Client,
    config: Result<RecordStoreConfig, ConfigurationError>,
}

impl HttpRecordStore {
    pub fn new(http: reqwest::Client, config: Result<RecordStoreConfig, ConfigurationError>) -> Self {
        Self { http, config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_ok()
    }

    fn config(&self) -> Result<&RecordStoreConfig, LookupError> {
        self.config
            .as_ref()
            .map_err(|err| LookupError::Configuration(err.clone()))
    }

    fn request(
        &self,
        config: &RecordStoreConfig,
        method: reqwest::Method,
        collection: &str,
    ) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/rest/v1/{}",
            config.url.as_str().trim_end_matches('/'),
            collection
        );
        self.http
            .request(method, url)
            .header("apikey", &config.anon_key)
            .bearer_auth(&config.anon_key)
    }
}

/// Render ids as a PostgREST `in.(...)` filter. Text ids are quoted.
pub(crate) fn in_filter(ids: &BTreeSet<RecordId>) -> String {
    let values = ids
        .iter()
        .map(|id| match id {
            RecordId::Int(value) => value.to_string(),
            RecordId::Text(value) => {
                format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({values})")
}

async fn check_status(
    collection: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, LookupError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LookupError::Status {
        collection: collection.to_string(),
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RecordLookupClient for HttpRecordStore {
    async fn lookup_by_ids(&self, ids: &BTreeSet<RecordId>) -> Result<Vec<Record>, LookupError> {
        // An empty `in.()` would be a degenerate select-all.
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let config = self.config()?;
        let collection = config.collection.as_str();

        tracing::debug!(collection, ids = ids.len(), "looking up records");
        let response = self
            .request(config, reqwest::Method::GET, collection)
            .query(&[("select", RECORD_FIELDS.to_string()), ("id", in_filter(ids))])
            .send()
            .await
            .map_err(|e| LookupError::Request {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        check_status(collection, response)
            .await?
            .json::<Vec<Record>>()
            .await
            .map_err(|e| LookupError::Decode {
                collection: collection.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl BrowseRecorder for HttpRecordStore {
    async fn record_browse(&self, user_id: &str, record_id: &RecordId) -> Result<(), LookupError> {
        let config = self.config()?;
        let collection = config.browse_collection.as_str();
        let rows = [BrowseEvent {
            user_id: user_id.to_string(),
            info_id: record_id.clone(),
        }];

        let result = match self
            .request(config, reqwest::Method::POST, collection)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await
        {
            Ok(response) => check_status(collection, response).await.map(|_| ()),
            Err(e) => Err(LookupError::Request {
                collection: collection.to_string(),
                message: e.to_string(),
            }),
        };

        match &result {
            Ok(()) => tracing::info!(user_id, record_id = %record_id, "browse record inserted"),
            Err(err) => tracing::warn!(user_id, record_id = %record_id, error = %err, "browse insert failed"),
        }
        result
    }
}
