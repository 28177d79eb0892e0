//! Stateful coordinators for the two fetch lifecycles.
//!
//! Runtime shape, per request:
//! 1) advance the generation and publish the loading state
//! 2) await the remote query (search text or recommendations)
//! 3) if any ids came back, await the record lookup
//! 4) publish the settled state, unless a newer request took over meanwhile
//!
//! Every publish re-checks the request's generation inside the `watch`
//! write lock, so a superseded request can never overwrite newer state.

pub mod generation;
mod recommendation;
mod search;

use std::collections::BTreeSet;

use shared_types::{Record, RecordId};
use tokio::sync::watch;

use crate::clients::RecordLookupClient;
use generation::{RequestGeneration, Ticket};

pub use recommendation::{FeedPhase, FeedSession, LoadOutcome, RecommendationOrchestrator};
pub use search::{SearchOrchestrator, SearchPhase, SearchSession, SubmitOutcome};

/// Result of the enrichment stage. A failed lookup is not fatal: the
/// session keeps its hits and records the failure on the side.
#[derive(Debug)]
struct Enrichment {
    records: Option<Vec<Record>>,
    lookup_error: Option<String>,
}

async fn enrich(records: &dyn RecordLookupClient, ids: BTreeSet<RecordId>) -> Enrichment {
    let requested = ids.len();
    match records.lookup_by_ids(&ids).await {
        Ok(found) => {
            tracing::debug!(requested, found = found.len(), "records looked up");
            Enrichment {
                records: Some(found),
                lookup_error: None,
            }
        }
        Err(err) => {
            tracing::warn!(requested, error = %err, "record lookup failed; publishing unenriched hits");
            Enrichment {
                records: None,
                lookup_error: Some(err.to_string()),
            }
        }
    }
}

/// Apply `update` only while `ticket` is still the current generation.
fn publish_if_current<S>(
    state: &watch::Sender<S>,
    generation: &RequestGeneration,
    ticket: Ticket,
    update: impl FnOnce(&mut S),
) -> bool {
    let applied = state.send_if_modified(|session| {
        if !generation.is_current(ticket) {
            return false;
        }
        update(session);
        true
    });
    if !applied {
        tracing::debug!(
            generation = ticket.value(),
            current = generation.current(),
            "dropping result of superseded request"
        );
    }
    applied
}
