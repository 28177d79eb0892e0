//! Search orchestrator lifecycle tests

mod support;

use std::sync::Arc;

use bulletin::clients::HttpRemoteQueryClient;
use bulletin::config::SearchOptions;
use bulletin::error::SessionError;
use bulletin::orchestrator::{SearchOrchestrator, SearchPhase, SearchSession, SubmitOutcome};
use shared_types::RecordId;
use support::{hit, record, response, unavailable, FakeRecords, FakeRemote};

fn orchestrator(remote: Arc<FakeRemote>, records: Arc<FakeRecords>) -> SearchOrchestrator {
    SearchOrchestrator::new(remote, records, SearchOptions::default())
}

#[tokio::test]
async fn test_blank_query_is_a_noop() {
    let remote = FakeRemote::new();
    let records = FakeRecords::with(vec![]);
    let search = orchestrator(remote.clone(), records.clone());
    let rx = search.subscribe();

    assert_eq!(search.submit("").await, SubmitOutcome::Rejected);
    assert_eq!(search.submit("   \t ").await, SubmitOutcome::Rejected);

    assert!(remote.search_calls().is_empty());
    assert!(records.calls().is_empty());
    assert!(!rx.has_changed().unwrap());
    assert_eq!(search.snapshot(), SearchSession::default());
}

#[tokio::test]
async fn test_partial_lookup_publishes_fallback_topics_in_rank_order() {
    let remote = FakeRemote::new();
    remote.script_search(
        "生育補助",
        Ok(response("可申請生育補助。", vec![hit(1, 0.9), hit(2, 0.8)])),
    );
    let records = FakeRecords::with(vec![record(1, "補助方案")]);
    let search = orchestrator(remote.clone(), records.clone());

    assert_eq!(search.submit("生育補助").await, SubmitOutcome::Ready);

    let session = search.snapshot();
    assert_eq!(session.phase, SearchPhase::Ready);
    assert_eq!(session.query_text, "生育補助");
    assert_eq!(session.answer.as_deref(), Some("可申請生育補助。"));
    assert!(session.error.is_none());
    assert!(session.lookup_error.is_none());
    assert!(session.settled_at.is_some());

    let items = session.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, RecordId::Int(1));
    assert_eq!(items[0].topic, "補助方案");
    assert_eq!(items[0].score, 0.9);
    assert_eq!(items[1].id, RecordId::Int(2));
    assert_eq!(items[1].topic, "ID: 2");
    assert_eq!(items[1].score, 0.8);

    let lookups = records.calls();
    assert_eq!(lookups.len(), 1);
    assert_eq!(
        lookups[0].iter().cloned().collect::<Vec<_>>(),
        vec![RecordId::Int(1), RecordId::Int(2)]
    );
}

#[tokio::test]
async fn test_lookup_failure_degrades_to_raw_hits() {
    let remote = FakeRemote::new();
    remote.script_search("生育補助", Ok(response("", vec![hit(1, 0.9), hit(2, 0.8)])));
    let search = orchestrator(remote, FakeRecords::failing());

    assert_eq!(search.submit("生育補助").await, SubmitOutcome::Ready);

    let session = search.snapshot();
    assert_eq!(session.phase, SearchPhase::Ready);
    assert!(session.error.is_none(), "lookup failures are not the primary error");
    assert!(session.lookup_error.is_some());
    assert!(session.records.is_none());

    let topics: Vec<String> = session.items().into_iter().map(|i| i.topic).collect();
    assert_eq!(topics, vec!["ID: 1", "ID: 2"]);
}

#[tokio::test]
async fn test_search_failure_clears_previous_results() {
    let remote = FakeRemote::new();
    remote.script_search("first", Ok(response("ok", vec![hit(1, 0.5)])));
    remote.script_search("second", Err(unavailable("/qa/search")));
    let search = orchestrator(remote, FakeRecords::with(vec![record(1, "a")]));

    assert_eq!(search.submit("first").await, SubmitOutcome::Ready);
    assert_eq!(search.snapshot().items().len(), 1);

    assert_eq!(search.submit("second").await, SubmitOutcome::Failed);
    let session = search.snapshot();
    assert_eq!(session.phase, SearchPhase::Failed);
    assert_eq!(session.query_text, "second");
    assert_eq!(session.error, Some(SessionError::Unavailable));
    assert!(session.hits.is_empty());
    assert!(session.records.is_none());
    assert!(session.answer.is_none());
    assert!(session.items().is_empty());
    assert!(session.show_results());
}

#[tokio::test]
async fn test_unconfigured_backend_fails_fast() {
    let remote = Arc::new(HttpRemoteQueryClient::new(reqwest::Client::new(), None));
    let records = FakeRecords::with(vec![]);
    let search = SearchOrchestrator::new(remote, records.clone(), SearchOptions::default());

    assert_eq!(search.submit("托育").await, SubmitOutcome::Failed);

    let session = search.snapshot();
    assert_eq!(
        session.error,
        Some(SessionError::NotConfigured("BACKEND_API_BASE_URL".to_string()))
    );
    assert!(records.calls().is_empty());
}

#[tokio::test]
async fn test_empty_sources_skip_the_lookup() {
    let remote = FakeRemote::new();
    remote.script_search("nothing", Ok(response("查無資料", vec![])));
    let records = FakeRecords::with(vec![record(1, "a")]);
    let search = orchestrator(remote, records.clone());

    assert_eq!(search.submit("nothing").await, SubmitOutcome::Ready);

    let session = search.snapshot();
    assert_eq!(session.phase, SearchPhase::Ready);
    assert_eq!(session.answer.as_deref(), Some("查無資料"));
    assert!(session.items().is_empty());
    assert!(records.calls().is_empty());
}

#[tokio::test]
async fn test_query_is_trimmed_before_sending() {
    let remote = FakeRemote::new();
    let search = orchestrator(remote.clone(), FakeRecords::with(vec![]));

    search.submit("  育兒津貼 ").await;

    assert_eq!(remote.search_calls(), vec!["育兒津貼".to_string()]);
    assert_eq!(search.snapshot().query_text, "育兒津貼");
}

#[tokio::test]
async fn test_hits_are_published_while_enriching() {
    let remote = FakeRemote::new();
    remote.script_search("q", Ok(response("answer", vec![hit(1, 0.9)])));
    let (records, gate) = FakeRecords::gated(vec![record(1, "補助方案")]);
    let search = orchestrator(remote, records);
    let mut rx = search.subscribe();

    let (outcome, ()) = tokio::join!(search.submit("q"), async {
        {
            let session = rx
                .wait_for(|s| s.phase == SearchPhase::EnrichingRecords)
                .await
                .expect("orchestrator dropped");
            assert!(session.is_loading());
            assert_eq!(session.hits.len(), 1);
            assert_eq!(session.items()[0].topic, "ID: 1");
        }
        gate.notify_one();
    });

    assert_eq!(outcome, SubmitOutcome::Ready);
    let session = search.snapshot();
    assert!(!session.is_loading());
    assert_eq!(session.items()[0].topic, "補助方案");
}

#[tokio::test]
async fn test_slow_first_query_does_not_overwrite_second() {
    let remote = FakeRemote::new();
    remote.script_search("slow", Ok(response("slow answer", vec![hit(1, 0.9)])));
    remote.script_search("fast", Ok(response("fast answer", vec![hit(2, 0.7)])));
    let slow_gate = remote.gate_search("slow");
    let records = FakeRecords::with(vec![record(1, "舊結果"), record(2, "新結果")]);
    let search = orchestrator(remote, records);
    let mut rx = search.subscribe();

    let (slow, fast, ()) = tokio::join!(search.submit("slow"), search.submit("fast"), async {
        rx.wait_for(|s| s.query_text == "fast" && s.phase == SearchPhase::Ready)
            .await
            .expect("orchestrator dropped");
        slow_gate.notify_one();
    });

    assert_eq!(slow, SubmitOutcome::Superseded);
    assert_eq!(fast, SubmitOutcome::Ready);

    let session = search.snapshot();
    assert_eq!(session.query_text, "fast");
    assert_eq!(session.answer.as_deref(), Some("fast answer"));
    let topics: Vec<String> = session.items().into_iter().map(|i| i.topic).collect();
    assert_eq!(topics, vec!["新結果"]);
}

#[tokio::test]
async fn test_slow_lookup_does_not_overwrite_second_query() {
    let remote = FakeRemote::new();
    remote.script_search("slow", Ok(response("slow answer", vec![hit(1, 0.9)])));
    remote.script_search("fast", Ok(response("fast answer", vec![hit(2, 0.7)])));
    let (records, slow_lookup) =
        FakeRecords::gated(vec![record(1, "舊結果"), record(2, "新結果")]);
    let search = orchestrator(remote, records.clone());
    let mut rx = search.subscribe();

    let (slow, fast) = tokio::join!(search.submit("slow"), async {
        rx.wait_for(|s| s.query_text == "slow" && s.phase == SearchPhase::EnrichingRecords)
            .await
            .expect("orchestrator dropped");
        let fast = search.submit("fast").await;
        slow_lookup.notify_one();
        fast
    });

    assert_eq!(slow, SubmitOutcome::Superseded);
    assert_eq!(fast, SubmitOutcome::Ready);
    assert_eq!(records.calls().len(), 2);

    let session = search.snapshot();
    assert_eq!(session.query_text, "fast");
    assert_eq!(session.answer.as_deref(), Some("fast answer"));
    let topics: Vec<String> = session.items().into_iter().map(|i| i.topic).collect();
    assert_eq!(topics, vec!["新結果"]);
}

#[tokio::test]
async fn test_clear_after_ready_resets_everything() {
    let remote = FakeRemote::new();
    remote.script_search("q", Ok(response("a", vec![hit(1, 0.9)])));
    let search = orchestrator(remote, FakeRecords::with(vec![record(1, "t")]));

    search.submit("q").await;
    assert_eq!(search.snapshot().phase, SearchPhase::Ready);

    search.clear();
    let session = search.snapshot();
    assert_eq!(session.phase, SearchPhase::Idle);
    assert!(session.query_text.is_empty());
    assert!(session.items().is_empty());
    assert!(session.records.is_none());
    assert!(!session.show_results());

    let rx = search.subscribe();
    search.clear();
    assert!(!rx.has_changed().unwrap(), "clearing twice changes nothing");
    assert_eq!(search.snapshot(), SearchSession::default());
}

#[tokio::test]
async fn test_clear_discards_in_flight_search() {
    let remote = FakeRemote::new();
    remote.script_search("q", Ok(response("late", vec![hit(1, 0.9)])));
    let gate = remote.gate_search("q");
    let records = FakeRecords::with(vec![]);
    let search = orchestrator(remote, records.clone());
    let mut rx = search.subscribe();

    let (outcome, ()) = tokio::join!(search.submit("q"), async {
        rx.wait_for(|s| s.phase == SearchPhase::Searching)
            .await
            .expect("orchestrator dropped");
        search.clear();
        gate.notify_one();
    });

    assert_eq!(outcome, SubmitOutcome::Superseded);
    assert_eq!(search.snapshot(), SearchSession::default());
    assert!(records.calls().is_empty());
}

#[tokio::test]
async fn test_new_submit_after_failure_recovers() {
    let remote = FakeRemote::new();
    remote.script_search("bad", Err(unavailable("/qa/search")));
    remote.script_search("good", Ok(response("ok", vec![hit(3, 0.4)])));
    let search = orchestrator(remote, FakeRecords::with(vec![record(3, "托育公告")]));

    assert_eq!(search.submit("bad").await, SubmitOutcome::Failed);
    assert_eq!(search.submit("good").await, SubmitOutcome::Ready);

    let session = search.snapshot();
    assert!(session.error.is_none());
    assert_eq!(session.items()[0].topic, "托育公告");
}

#[tokio::test]
async fn test_clear_during_enrichment_blocks_later_publishes() {
    let remote = FakeRemote::new();
    remote.script_search("q", Ok(response("late", vec![hit(1, 0.9)])));
    let (records, gate) = FakeRecords::gated(vec![record(1, "t")]);
    let search = orchestrator(remote, records);
    let mut rx = search.subscribe();

    let (outcome, after_clear) = tokio::join!(search.submit("q"), async {
        rx.wait_for(|s| s.phase == SearchPhase::EnrichingRecords)
            .await
            .expect("orchestrator dropped");
        search.clear();
        let after_clear = search.subscribe();
        gate.notify_one();
        after_clear
    });

    assert_eq!(outcome, SubmitOutcome::Superseded);
    assert!(!after_clear.has_changed().unwrap(), "nothing lands after clear");
    assert_eq!(search.snapshot(), SearchSession::default());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clear_never_leaves_results_without_a_query() {
    for round in 0..200 {
        let remote = FakeRemote::new();
        remote.script_search("q", Ok(response("a", vec![hit(1, 0.9)])));
        let search = Arc::new(orchestrator(remote, FakeRecords::with(vec![record(1, "t")])));

        let submitter = tokio::spawn({
            let search = search.clone();
            async move { search.submit("q").await }
        });
        let clearer = tokio::spawn({
            let search = search.clone();
            async move { search.clear() }
        });
        submitter.await.unwrap();
        clearer.await.unwrap();

        let session = search.snapshot();
        let consistent = match session.phase {
            SearchPhase::Idle => session == SearchSession::default(),
            SearchPhase::Ready => session.query_text == "q",
            _ => false,
        };
        assert!(consistent, "round {round}: {session:?}");
    }
}
