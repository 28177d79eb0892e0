use std::sync::Arc;

use crate::clients::{build_http_client, BrowseRecorder, HttpRecordStore, HttpRemoteQueryClient};
use crate::config::Config;
use crate::orchestrator::{RecommendationOrchestrator, SearchOrchestrator};

/// Everything the presentation layer needs, built once at startup.
///
/// Both orchestrators share the same two clients; their session states stay
/// disjoint.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    remote: Arc<HttpRemoteQueryClient>,
    record_store: Arc<HttpRecordStore>,
    search: SearchOrchestrator,
    feed: RecommendationOrchestrator,
}

impl AppState {
    pub fn new(config: Config, http: reqwest::Client) -> Self {
        let remote = Arc::new(HttpRemoteQueryClient::new(
            http.clone(),
            config.backend_api_base_url.clone(),
        ));
        let record_store = Arc::new(HttpRecordStore::new(http, config.record_store()));

        let search = SearchOrchestrator::new(remote.clone(), record_store.clone(), config.search);
        let feed = RecommendationOrchestrator::new(
            remote.clone(),
            record_store.clone(),
            config.default_user_id.clone(),
            config.recommend,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                remote,
                record_store,
                search,
                feed,
            }),
        }
    }

    /// Build the shared HTTP client from `config` and wire everything to it.
    pub fn from_config(config: Config) -> reqwest::Result<Self> {
        let http = build_http_client(config.http_timeout)?;
        Ok(Self::new(config, http))
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn search(&self) -> &SearchOrchestrator {
        &self.inner.search
    }

    pub fn feed(&self) -> &RecommendationOrchestrator {
        &self.inner.feed
    }

    /// A feed for someone other than the configured default user.
    pub fn feed_for(&self, user_id: impl Into<String>) -> RecommendationOrchestrator {
        RecommendationOrchestrator::new(
            self.inner.remote.clone(),
            self.inner.record_store.clone(),
            Some(user_id.into()),
            self.inner.config.recommend,
        )
    }

    pub fn browse_recorder(&self) -> Arc<dyn BrowseRecorder> {
        self.inner.record_store.clone()
    }

    pub fn backend_configured(&self) -> bool {
        self.inner.remote.is_configured()
    }

    pub fn record_store_configured(&self) -> bool {
        self.inner.record_store.is_configured()
    }
}
