//! Environment-driven configuration.
//!
//! Every endpoint is optional: a missing value leaves the dependent client in
//! a degraded mode where calls fail fast with [`ConfigurationError::Missing`].
//! Values that are present but malformed are rejected at startup.

use std::time::Duration;

use shared_types::RecommendParams;
use url::Url;

use crate::error::ConfigurationError;

pub const BACKEND_API_BASE_URL: &str = "BACKEND_API_BASE_URL";
pub const RECORD_STORE_URL: &str = "SUPABASE_URL";
pub const RECORD_STORE_KEY: &str = "SUPABASE_ANON_KEY";
pub const DEFAULT_USER_ID: &str = "DEFAULT_USER_ID";

/// Prefix used by the web frontend's build-time variables; accepted as a fallback.
const PUBLIC_PREFIX: &str = "NEXT_PUBLIC_";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub top_k: u32,
    pub min_score: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 6,
            min_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStoreConfig {
    /// Project URL of the record store (PostgREST lives under `/rest/v1`)
    pub url: Url,
    /// Anonymous access key, sent as both `apikey` and bearer token
    pub anon_key: String,
    /// Collection holding the descriptive records
    pub collection: String,
    /// Collection receiving browse rows
    pub browse_collection: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the QA / recommendation service
    pub backend_api_base_url: Option<Url>,
    /// Record store endpoint and credentials
    pub record_store: Option<RecordStoreConfig>,
    /// Record store keys absent from the environment
    record_store_gaps: Vec<&'static str>,
    /// User the personalized feed is fetched for
    pub default_user_id: Option<String>,
    pub search: SearchOptions,
    pub recommend: RecommendParams,
    /// Optional transport timeout applied to every HTTP call
    pub http_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .or_else(|| lookup(&format!("{PUBLIC_PREFIX}{key}")))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend_api_base_url = get(BACKEND_API_BASE_URL)
            .map(|raw| parse_url(BACKEND_API_BASE_URL, &raw))
            .transpose()?;

        let store_url = get(RECORD_STORE_URL);
        let store_key = get(RECORD_STORE_KEY);
        let record_store_gaps: Vec<&'static str> = [
            (RECORD_STORE_URL, store_url.is_none()),
            (RECORD_STORE_KEY, store_key.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();
        let record_store = match (store_url, store_key) {
            (Some(url), Some(anon_key)) => Some(RecordStoreConfig {
                url: parse_url(RECORD_STORE_URL, &url)?,
                anon_key,
                collection: get("RECORD_COLLECTION").unwrap_or_else(|| "info".to_string()),
                browse_collection: get("BROWSE_COLLECTION")
                    .unwrap_or_else(|| "browse".to_string()),
            }),
            _ => None,
        };

        let defaults = RecommendParams::default();
        Ok(Self {
            backend_api_base_url,
            record_store,
            record_store_gaps,
            default_user_id: get(DEFAULT_USER_ID),
            search: SearchOptions {
                top_k: parse_or(&get, "SEARCH_TOP_K", SearchOptions::default().top_k)?,
                min_score: parse_or(&get, "SEARCH_MIN_SCORE", SearchOptions::default().min_score)?,
            },
            recommend: RecommendParams {
                lambda: parse_or(&get, "RECOMMEND_LAMBDA", defaults.lambda)?,
                alpha: parse_or(&get, "RECOMMEND_ALPHA", defaults.alpha)?,
                top_k: parse_or(&get, "RECOMMEND_TOP_K", defaults.top_k)?,
            },
            http_timeout: get("HTTP_TIMEOUT_SECS")
                .map(|raw| parse_value::<u64>("HTTP_TIMEOUT_SECS", &raw))
                .transpose()?
                .map(Duration::from_secs),
        })
    }

    /// Keys whose absence puts part of the app in degraded mode.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.backend_api_base_url.is_none() {
            missing.push(BACKEND_API_BASE_URL);
        }
        missing.extend(&self.record_store_gaps);
        if self.default_user_id.is_none() {
            missing.push(DEFAULT_USER_ID);
        }
        missing
    }

    /// Record store settings, or the first record store key that is absent.
    pub fn record_store(&self) -> Result<RecordStoreConfig, ConfigurationError> {
        match (&self.record_store, self.record_store_gaps.first()) {
            (Some(store), _) => Ok(store.clone()),
            (None, Some(key)) => Err(ConfigurationError::Missing(*key)),
            (None, None) => Err(ConfigurationError::Missing(RECORD_STORE_URL)),
        }
    }

    /// Surface degraded mode once, at startup.
    pub fn log_degraded(&self) {
        for key in self.missing() {
            tracing::warn!(key, "configuration missing; dependent operations will fail fast");
        }
    }
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigurationError> {
    Url::parse(raw).map_err(|e| ConfigurationError::Invalid {
        key,
        reason: format!("{raw:?} is not a valid URL: {e}"),
    })
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigurationError>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigurationError::Invalid {
        key,
        reason: format!("failed to parse {raw:?}: {e}"),
    })
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigurationError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

/// Load `.env` from the current directory or the nearest ancestor that has one.
pub fn load_env_file() {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "Could not determine current directory for .env lookup");
            return;
        }
    };

    for dir in cwd.ancestors() {
        let candidate = dir.join(".env");
        if !candidate.exists() {
            continue;
        }
        match dotenvy::from_path(&candidate) {
            Ok(_) => tracing::info!(path = %candidate.display(), "Loaded environment from .env"),
            Err(e) => tracing::warn!(
                path = %candidate.display(),
                error = %e,
                "Failed to load .env file"
            ),
        }
        return;
    }

    tracing::debug!(cwd = %cwd.display(), "No .env file found; using process environment only");
}
