//! Join of ranked hits with looked-up records.

use std::collections::{BTreeSet, HashMap};

use shared_types::{EnrichedItem, RecommendationHit, Record, RecordId, SearchHit};

/// Anything the remote service ranks: carries the join key and a score,
/// plus whatever descriptive fields the service already knows.
pub trait RankedHit {
    fn id(&self) -> &RecordId;
    fn score(&self) -> f64;

    fn title(&self) -> Option<&str> {
        None
    }

    fn department(&self) -> Option<&str> {
        None
    }

    fn url(&self) -> Option<&str> {
        None
    }
}

impl RankedHit for SearchHit {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn score(&self) -> f64 {
        self.score
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl RankedHit for RecommendationHit {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn score(&self) -> f64 {
        self.hybrid_score
    }
}

/// Distinct ids to look up for a batch of hits.
pub fn lookup_ids<H: RankedHit>(hits: &[H]) -> BTreeSet<RecordId> {
    hits.iter().map(|hit| hit.id().clone()).collect()
}

/// Overlay records onto hits, keeping the hits' ranking order.
///
/// Record fields win over hit fields; the score always comes from the hit.
/// The topic falls back to the hit title, then to `ID: <id>`. Only a missing
/// value triggers the fallback, so an explicitly empty topic survives the
/// coalescing and is dropped by the final filter.
pub fn merge<H: RankedHit>(hits: &[H], records: &[Record]) -> Vec<EnrichedItem> {
    let by_id: HashMap<&RecordId, &Record> =
        records.iter().map(|record| (&record.id, record)).collect();

    hits.iter()
        .map(|hit| {
            let record = by_id.get(hit.id()).copied();
            let from_record = |field: fn(&Record) -> Option<&String>| {
                record.and_then(field).cloned()
            };

            let topic = from_record(|r| r.topic.as_ref())
                .or_else(|| hit.title().map(str::to_string))
                .unwrap_or_else(|| format!("ID: {}", hit.id()));

            EnrichedItem {
                id: hit.id().clone(),
                topic,
                content: from_record(|r| r.content.as_ref()),
                url: from_record(|r| r.url.as_ref()).or_else(|| hit.url().map(str::to_string)),
                department: from_record(|r| r.department.as_ref())
                    .or_else(|| hit.department().map(str::to_string)),
                image: from_record(|r| r.image.as_ref()),
                score: hit.score(),
            }
        })
        .filter(|item| !item.topic.is_empty())
        .collect()
}
