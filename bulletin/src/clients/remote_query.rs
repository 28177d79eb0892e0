use async_trait::async_trait;
use shared_types::{RecommendParams, RecommendationHit, SearchRequest, SearchResponse};
use url::Url;

use crate::config::BACKEND_API_BASE_URL;
use crate::error::{ConfigurationError, TransportError};

pub const QA_SEARCH_ENDPOINT: &str = "/qa/search";
pub const RECOMMEND_ENDPOINT: &str = "/recommend";

/// The QA search and recommendation service.
///
/// Implementations never retry; a failed call is reported once and the
/// caller decides what to do with it.
#[async_trait]
pub trait RemoteQueryClient: Send + Sync {
    async fn search(
        &self,
        query: &str,
        top_k: u32,
        min_score: f64,
    ) -> Result<SearchResponse, TransportError>;

    async fn recommend(
        &self,
        user_id: &str,
        params: RecommendParams,
    ) -> Result<Vec<RecommendationHit>, TransportError>;
}

/// [`RemoteQueryClient`] over HTTP.
///
/// Without a base URL every call fails with a configuration error before
/// touching the network.
#[derive(Debug, Clone)]
pub struct HttpRemoteQueryClient {
    http: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpRemoteQueryClient {
    pub fn new(http: reqwest::Client, base_url: Option<Url>) -> Self {
        Self { http, base_url }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<String, TransportError> {
        let base = self
            .base_url
            .as_ref()
            .ok_or(ConfigurationError::Missing(BACKEND_API_BASE_URL))?;
        Ok(format!("{}{}", base.as_str().trim_end_matches('/'), path))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransportError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    response.json().await.map_err(|e| TransportError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl RemoteQueryClient for HttpRemoteQueryClient {
    async fn search(
        &self,
        query: &str,
        top_k: u32,
        min_score: f64,
    ) -> Result<SearchResponse, TransportError> {
        let url = self.endpoint(QA_SEARCH_ENDPOINT)?;
        let body = SearchRequest {
            query: query.to_string(),
            top_k,
            min_score,
        };

        tracing::debug!(url = %url, top_k, min_score, "issuing QA search");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                endpoint: QA_SEARCH_ENDPOINT.to_string(),
                message: e.to_string(),
            })?;

        read_json(QA_SEARCH_ENDPOINT, response).await
    }

    async fn recommend(
        &self,
        user_id: &str,
        params: RecommendParams,
    ) -> Result<Vec<RecommendationHit>, TransportError> {
        let url = self.endpoint(RECOMMEND_ENDPOINT)?;

        tracing::debug!(url = %url, user_id, ?params, "fetching recommendations");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("user_id", user_id.to_string()),
                ("lambda_", params.lambda.to_string()),
                ("alpha", params.alpha.to_string()),
                ("top_k", params.top_k.to_string()),
            ])
            .send()
            .await
            .map_err(|e| TransportError::Request {
                endpoint: RECOMMEND_ENDPOINT.to_string(),
                message: e.to_string(),
            })?;

        read_json(RECOMMEND_ENDPOINT, response).await
    }
}
