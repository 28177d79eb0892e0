//! Scriptable fakes for the orchestrator tests.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bulletin::clients::{RecordLookupClient, RemoteQueryClient};
use bulletin::error::{LookupError, TransportError};
use shared_types::{
    RecommendParams, RecommendationHit, Record, RecordId, SearchHit, SearchResponse,
};
use tokio::sync::Notify;

pub fn hit(id: i64, score: f64) -> SearchHit {
    SearchHit {
        id: RecordId::Int(id),
        score,
        title: None,
        department: None,
        url: None,
    }
}

pub fn rec_hit(id: i64, hybrid_score: f64) -> RecommendationHit {
    RecommendationHit {
        id: RecordId::Int(id),
        hybrid_score,
    }
}

pub fn record(id: i64, topic: &str) -> Record {
    Record {
        id: RecordId::Int(id),
        topic: Some(topic.to_string()),
        content: None,
        url: None,
        department: None,
        image: None,
    }
}

pub fn response(answer: &str, sources: Vec<SearchHit>) -> SearchResponse {
    SearchResponse {
        answer: answer.to_string(),
        sources,
    }
}

pub fn unavailable(endpoint: &str) -> TransportError {
    TransportError::Status {
        endpoint: endpoint.to_string(),
        status: 503,
        body: "upstream down".to_string(),
    }
}

type ScriptedRecommendation = (Option<Arc<Notify>>, Result<Vec<RecommendationHit>, TransportError>);

/// Remote service answering from a script. Queries without a scripted
/// answer get an empty response.
#[derive(Default)]
pub struct FakeRemote {
    search_results: Mutex<HashMap<String, Result<SearchResponse, TransportError>>>,
    search_gates: Mutex<HashMap<String, Arc<Notify>>>,
    recommendations: Mutex<VecDeque<ScriptedRecommendation>>,
    search_calls: Mutex<Vec<String>>,
    recommend_calls: Mutex<Vec<(String, RecommendParams)>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_search(&self, query: &str, result: Result<SearchResponse, TransportError>) {
        self.search_results
            .lock()
            .unwrap()
            .insert(query.to_string(), result);
    }

    /// Hold searches for `query` until the returned handle is notified.
    pub fn gate_search(&self, query: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.search_gates
            .lock()
            .unwrap()
            .insert(query.to_string(), gate.clone());
        gate
    }

    pub fn script_recommendations(&self, result: Result<Vec<RecommendationHit>, TransportError>) {
        self.recommendations.lock().unwrap().push_back((None, result));
    }

    pub fn script_gated_recommendations(
        &self,
        result: Result<Vec<RecommendationHit>, TransportError>,
    ) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.recommendations
            .lock()
            .unwrap()
            .push_back((Some(gate.clone()), result));
        gate
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn recommend_calls(&self) -> Vec<(String, RecommendParams)> {
        self.recommend_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteQueryClient for FakeRemote {
    async fn search(
        &self,
        query: &str,
        _top_k: u32,
        _min_score: f64,
    ) -> Result<SearchResponse, TransportError> {
        self.search_calls.lock().unwrap().push(query.to_string());
        let gate = self.search_gates.lock().unwrap().get(query).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.search_results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(SearchResponse::default()))
    }

    async fn recommend(
        &self,
        user_id: &str,
        params: RecommendParams,
    ) -> Result<Vec<RecommendationHit>, TransportError> {
        self.recommend_calls
            .lock()
            .unwrap()
            .push((user_id.to_string(), params));
        let scripted = self.recommendations.lock().unwrap().pop_front();
        let Some((gate, result)) = scripted else {
            return Ok(Vec::new());
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }
}

/// Record store holding a fixed set of records, or failing every lookup.
#[derive(Default)]
pub struct FakeRecords {
    records: Vec<Record>,
    fail: bool,
    gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<BTreeSet<RecordId>>>,
}

impl FakeRecords {
    pub fn with(records: Vec<Record>) -> Arc<Self> {
        Arc::new(Self {
            records,
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    /// The first lookup waits for the returned handle before answering;
    /// later lookups answer right away.
    pub fn gated(records: Vec<Record>) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let store = Arc::new(Self {
            records,
            gate: Mutex::new(Some(gate.clone())),
            ..Self::default()
        });
        (store, gate)
    }

    pub fn calls(&self) -> Vec<BTreeSet<RecordId>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordLookupClient for FakeRecords {
    async fn lookup_by_ids(&self, ids: &BTreeSet<RecordId>) -> Result<Vec<Record>, LookupError> {
        self.calls.lock().unwrap().push(ids.clone());
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(LookupError::Status {
                collection: "info".to_string(),
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(self
            .records
            .iter()
            .filter(|record| ids.contains(&record.id))
            .cloned()
            .collect())
    }
}
