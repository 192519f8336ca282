//! End-to-end engine behaviour: conversation in, concept graph out
//!
//! Every test runs the real driver loop on paused tokio time with a scripted
//! extractor standing in for the language model.

mod common;

use common::{add_edge, add_node, diff, update_node, Harness, KAYAKING_DIFF};
use mindweave::snapshot::SnapshotStore;
use mindweave::transport::MockExtractor;
use mindweave::{hydrate, EdgeKey, EngineConfig};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn weekend_trip_conversation_builds_graph() {
    let mut h = Harness::start(
        EngineConfig::default(),
        MockExtractor::new().respond(KAYAKING_DIFF),
    );

    h.user_says("I'd love to go kayaking on our weekend trip");
    h.agent_replies("resp-agent-1");
    h.advance(1000).await;

    let state = h.state().await;
    assert_eq!(state.node_count(), 1);
    assert!(state.get_node("kayaking").is_some());
    assert!(state.get_node("weekend trip").is_none(), "edges may dangle");
    assert!(state.contains_edge(&EdgeKey::new("kayaking", "weekend trip", Some("part_of"))));
    assert_eq!(state.display_salience("kayaking"), Some(1));

    let calls = h.extractor.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].ends_with("user: I'd love to go kayaking on our weekend trip"));

    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn burst_of_turns_makes_one_extraction_call() {
    let mut h = Harness::start(
        EngineConfig::default(),
        MockExtractor::new().respond(KAYAKING_DIFF),
    );

    h.user_says("we should plan something");
    h.advance(200).await;
    h.agent_replies("resp-agent-1");
    h.advance(200).await;
    h.user_says("maybe kayaking?");
    h.advance(3000).await;

    assert_eq!(h.extractor.calls().len(), 1);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stale_completion_is_discarded_in_favour_of_latest() {
    let extractor = MockExtractor::new()
        .respond(diff(vec![add_node("old idea", 5.0)]))
        .respond(diff(vec![add_node("new idea", 5.0)]))
        .with_delay(Duration::from_millis(500));
    let h = Harness::start(EngineConfig::default(), extractor);

    h.handle.analyze_now();
    h.advance(100).await;
    h.handle.analyze_now();
    h.advance(1000).await;

    let state = h.state().await;
    assert!(state.get_node("old idea").is_none());
    assert!(state.get_node("new idea").is_some());
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn late_completion_after_timeout_is_still_applied() {
    let extractor = MockExtractor::new()
        .respond(diff(vec![add_node("slow answer", 5.0)]))
        .with_delay(Duration::from_millis(7000));
    let h = Harness::start(EngineConfig::default(), extractor);

    h.handle.analyze_now();
    h.advance(6500).await;
    assert!(h.state().await.is_empty());

    h.advance(1000).await;
    assert!(h.state().await.get_node("slow answer").is_some());
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn extractor_failure_is_not_fatal() {
    let extractor = MockExtractor::new()
        .fail("model overloaded")
        .respond(diff(vec![add_node("tent", 4.0)]));
    let h = Harness::start(EngineConfig::default(), extractor);

    h.handle.analyze_now();
    h.advance(10).await;
    assert!(h.state().await.is_empty());

    h.handle.analyze_now();
    h.advance(10).await;
    assert!(h.state().await.get_node("tent").is_some());
    assert_eq!(h.extractor.calls().len(), 2);
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn successive_diffs_accumulate() {
    let extractor = MockExtractor::new()
        .respond(diff(vec![
            add_node("kayaking", 7.0),
            add_node("camping", 2.0),
            add_edge("kayaking", "camping", "pairs_with"),
        ]))
        .respond(diff(vec![
            update_node("camping", "two nights by the lake"),
            json_op_unknown(),
        ]));
    let mut h = Harness::start(EngineConfig::default(), extractor);

    h.user_says("kayaking and camping");
    h.advance(1000).await;
    h.user_says("two nights by the lake");
    h.advance(1000).await;

    let state = h.state().await;
    let camping = state.get_node("camping").unwrap();
    assert_eq!(camping.summary.as_deref(), Some("two nights by the lake"));
    assert_eq!(camping.salience, Some(2.0));
    assert_eq!(state.display_salience("kayaking"), Some(10));
    assert_eq!(state.display_salience("camping"), Some(1));
    assert_eq!(state.edge_count(), 1);
    h.stop().await;
}

fn json_op_unknown() -> serde_json::Value {
    serde_json::json!({ "type": "merge_nodes", "labels": ["a", "b"] })
}

#[tokio::test(start_paused = true)]
async fn disconnected_session_does_not_schedule() {
    let mut h = Harness::start(
        EngineConfig::default(),
        MockExtractor::new().respond(KAYAKING_DIFF),
    );

    h.handle.connected(false);
    h.user_says("anyone there?");
    h.advance(2000).await;

    assert!(h.extractor.calls().is_empty());
    h.stop().await;
}

#[tokio::test(start_paused = true)]
async fn autosave_persists_active_workspace() {
    let config = EngineConfig::default().with_autosave(true);
    let mut h = Harness::start(config, MockExtractor::new().respond(KAYAKING_DIFF));

    h.handle.activate(Some("trips".to_string()));
    h.user_says("kayaking this weekend");
    h.advance(1000).await;

    let mut saved = None;
    for _ in 0..100 {
        saved = h.store.load("trips").unwrap();
        if saved.is_some() {
            break;
        }
        h.advance(1).await;
    }

    let snapshot = saved.expect("autosave should have written the workspace");
    assert_eq!(snapshot.workspace_key, "trips");
    assert!(hydrate(&snapshot).get_node("kayaking").is_some());
    h.stop().await;
}
