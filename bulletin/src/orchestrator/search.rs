use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared_types::{EnrichedItem, Record, SearchHit};
use tokio::sync::watch;

use super::generation::{RequestGeneration, Ticket};
use super::{enrich, publish_if_current};
use crate::clients::{RecordLookupClient, RemoteQueryClient};
use crate::config::SearchOptions;
use crate::error::{SessionError, TransportError};
use crate::merge::{lookup_ids, merge};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    #[default]
    Idle,
    Searching,
    EnrichingRecords,
    Ready,
    Failed,
}

/// Published state of the interactive search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSession {
    pub query_text: String,
    pub phase: SearchPhase,
    /// Free-text answer from the QA service
    pub answer: Option<String>,
    pub hits: Vec<SearchHit>,
    /// `None` until a lookup succeeded
    pub records: Option<Vec<Record>>,
    /// Primary, user-facing error
    pub error: Option<SessionError>,
    /// Record lookup failure; the hits are still shown unenriched
    pub lookup_error: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl SearchSession {
    /// Display list, recomputed from the latest hits and records.
    pub fn items(&self) -> Vec<EnrichedItem> {
        merge(&self.hits, self.records.as_deref().unwrap_or(&[]))
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.phase,
            SearchPhase::Searching | SearchPhase::EnrichingRecords
        )
    }

    /// Whether the results pane replaces the feed.
    pub fn show_results(&self) -> bool {
        self.phase != SearchPhase::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank query; nothing happened
    Rejected,
    Ready,
    Failed,
    /// A newer submit or a clear took over before this one settled
    Superseded,
}

/// Owns the interactive search lifecycle:
/// `Idle -> Searching -> (EnrichingRecords -> Ready) | Failed`.
pub struct SearchOrchestrator {
    remote: Arc<dyn RemoteQueryClient>,
    records: Arc<dyn RecordLookupClient>,
    options: SearchOptions,
    generation: RequestGeneration,
    state: watch::Sender<SearchSession>,
}

impl SearchOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteQueryClient>,
        records: Arc<dyn RecordLookupClient>,
        options: SearchOptions,
    ) -> Self {
        Self {
            remote,
            records,
            options,
            generation: RequestGeneration::default(),
            state: watch::Sender::new(SearchSession::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSession> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SearchSession {
        self.state.borrow().clone()
    }

    /// Run a search for `query`, superseding any request still in flight.
    pub async fn submit(&self, query: &str) -> SubmitOutcome {
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("ignoring blank query");
            return SubmitOutcome::Rejected;
        }

        let ticket = self.generation.advance();
        let started = self.publish(ticket, |session| {
            *session = SearchSession {
                query_text: query.to_string(),
                phase: SearchPhase::Searching,
                ..SearchSession::default()
            };
        });
        if !started {
            return SubmitOutcome::Superseded;
        }
        tracing::info!(generation = ticket.value(), query, "search started");

        let response = match self
            .remote
            .search(query, self.options.top_k, self.options.min_score)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                if matches!(err, TransportError::Configuration(_)) {
                    tracing::warn!(error = %err, "search skipped: backend not configured");
                } else {
                    tracing::error!(generation = ticket.value(), error = %err, "search failed");
                }
                let published = SessionError::from(&err);
                let applied = self.publish(ticket, move |session| {
                    session.phase = SearchPhase::Failed;
                    session.answer = None;
                    session.hits.clear();
                    session.records = None;
                    session.error = Some(published);
                    session.settled_at = Some(Utc::now());
                });
                return if applied {
                    SubmitOutcome::Failed
                } else {
                    SubmitOutcome::Superseded
                };
            }
        };

        let ids = lookup_ids(&response.sources);
        let hit_count = response.sources.len();
        if ids.is_empty() {
            let applied = self.publish(ticket, move |session| {
                session.phase = SearchPhase::Ready;
                session.answer = Some(response.answer);
                session.settled_at = Some(Utc::now());
            });
            if applied {
                tracing::info!(generation = ticket.value(), "search returned no sources");
                return SubmitOutcome::Ready;
            }
            return SubmitOutcome::Superseded;
        }

        let enriching = self.publish(ticket, move |session| {
            session.phase = SearchPhase::EnrichingRecords;
            session.answer = Some(response.answer);
            session.hits = response.sources;
        });
        if !enriching {
            return SubmitOutcome::Superseded;
        }

        let enrichment = enrich(self.records.as_ref(), ids).await;
        let enriched = enrichment.records.as_ref().map(Vec::len);
        let applied = self.publish(ticket, move |session| {
            session.phase = SearchPhase::Ready;
            session.records = enrichment.records;
            session.lookup_error = enrichment.lookup_error;
            session.settled_at = Some(Utc::now());
        });
        if !applied {
            return SubmitOutcome::Superseded;
        }

        tracing::info!(
            generation = ticket.value(),
            hits = hit_count,
            records = ?enriched,
            "search ready"
        );
        SubmitOutcome::Ready
    }

    fn publish(&self, ticket: Ticket, update: impl FnOnce(&mut SearchSession)) -> bool {
        publish_if_current(&self.state, &self.generation, ticket, update)
    }

    /// Back to `Idle`. Anything still in flight is discarded when it lands.
    pub fn clear(&self) {
        // Advance and reset under one write lock.
        self.state.send_if_modified(|session| {
            self.generation.advance();
            if *session == SearchSession::default() {
                return false;
            }
            *session = SearchSession::default();
            true
        });
        tracing::debug!("search cleared");
    }
}
