use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_types::{EnrichedItem, RecommendParams, RecommendationHit, Record};
use tokio::sync::watch;

use super::generation::{RequestGeneration, Ticket};
use super::{enrich, publish_if_current};
use crate::clients::{RecordLookupClient, RemoteQueryClient};
use crate::config::DEFAULT_USER_ID;
use crate::error::SessionError;
use crate::merge::{lookup_ids, merge};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedPhase {
    #[default]
    Loading,
    Enriching,
    Ready,
    Failed,
}

/// Published state of the personalized feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedSession {
    pub user_id: Option<String>,
    pub phase: FeedPhase,
    pub hits: Vec<RecommendationHit>,
    pub records: Option<Vec<Record>>,
    pub error: Option<SessionError>,
    pub lookup_error: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl FeedSession {
    pub fn items(&self) -> Vec<EnrichedItem> {
        merge(&self.hits, self.records.as_deref().unwrap_or(&[]))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, FeedPhase::Loading | FeedPhase::Enriching)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    Failed,
    /// A reload started before this fetch settled
    Superseded,
    /// `ensure_loaded` found the feed already triggered for this session
    AlreadyLoaded,
}

/// Background feed for one user: `Loading -> (Enriching -> Ready) | Failed`.
///
/// There is no idle state to return to; the session always ends up ready
/// or failed until it is explicitly reloaded.
pub struct RecommendationOrchestrator {
    remote: Arc<dyn RemoteQueryClient>,
    records: Arc<dyn RecordLookupClient>,
    user_id: Option<String>,
    params: RecommendParams,
    triggered: AtomicBool,
    generation: RequestGeneration,
    state: watch::Sender<FeedSession>,
}

impl RecommendationOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteQueryClient>,
        records: Arc<dyn RecordLookupClient>,
        user_id: Option<String>,
        params: RecommendParams,
    ) -> Self {
        let state = watch::Sender::new(FeedSession {
            user_id: user_id.clone(),
            ..FeedSession::default()
        });
        Self {
            remote,
            records,
            user_id,
            params,
            triggered: AtomicBool::new(false),
            generation: RequestGeneration::default(),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSession> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> FeedSession {
        self.state.borrow().clone()
    }

    /// First fetch of the session; later calls are no-ops.
    pub async fn ensure_loaded(&self) -> LoadOutcome {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return LoadOutcome::AlreadyLoaded;
        }
        self.fetch().await
    }

    /// External re-trigger, e.g. after the user switched accounts.
    pub async fn reload(&self) -> LoadOutcome {
        self.triggered.store(true, Ordering::SeqCst);
        self.fetch().await
    }

    async fn fetch(&self) -> LoadOutcome {
        let ticket = self.generation.advance();
        let user_id = self.user_id.clone();
        let started = self.publish(ticket, |session| {
            *session = FeedSession {
                user_id,
                phase: FeedPhase::Loading,
                ..FeedSession::default()
            };
        });
        if !started {
            return LoadOutcome::Superseded;
        }

        let Some(user_id) = self.user_id.as_deref() else {
            tracing::warn!(key = DEFAULT_USER_ID, "feed skipped: no user configured");
            return self.fail(ticket, SessionError::NotConfigured(DEFAULT_USER_ID.to_string()));
        };
        tracing::info!(generation = ticket.value(), user_id, "loading feed");

        let hits = match self.remote.recommend(user_id, self.params).await {
            Ok(hits) => hits,
            Err(err) => {
                tracing::error!(generation = ticket.value(), user_id, error = %err, "recommendations failed");
                return self.fail(ticket, SessionError::from(&err));
            }
        };

        let ids = lookup_ids(&hits);
        if ids.is_empty() {
            return self.settle(ticket, |session| {
                session.phase = FeedPhase::Ready;
                session.settled_at = Some(Utc::now());
            });
        }

        let hit_count = hits.len();
        let enriching = self.publish(ticket, move |session| {
            session.phase = FeedPhase::Enriching;
            session.hits = hits;
        });
        if !enriching {
            return LoadOutcome::Superseded;
        }

        let enrichment = enrich(self.records.as_ref(), ids).await;
        let outcome = self.settle(ticket, move |session| {
            session.phase = FeedPhase::Ready;
            session.records = enrichment.records;
            session.lookup_error = enrichment.lookup_error;
            session.settled_at = Some(Utc::now());
        });
        if outcome == LoadOutcome::Ready {
            tracing::info!(generation = ticket.value(), hits = hit_count, "feed ready");
        }
        outcome
    }

    fn fail(&self, ticket: Ticket, error: SessionError) -> LoadOutcome {
        let applied = self.publish(ticket, move |session| {
            session.phase = FeedPhase::Failed;
            session.hits.clear();
            session.records = None;
            session.error = Some(error);
            session.settled_at = Some(Utc::now());
        });
        if applied {
            LoadOutcome::Failed
        } else {
            LoadOutcome::Superseded
        }
    }

    fn settle(&self, ticket: Ticket, update: impl FnOnce(&mut FeedSession)) -> LoadOutcome {
        if self.publish(ticket, update) {
            LoadOutcome::Ready
        } else {
            LoadOutcome::Superseded
        }
    }

    fn publish(&self, ticket: Ticket, update: impl FnOnce(&mut FeedSession)) -> bool {
        publish_if_current(&self.state, &self.generation, ticket, update)
    }
}
