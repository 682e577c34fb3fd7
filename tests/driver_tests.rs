//! End-to-end dialog walkthroughs driven through the public `Driver` API,
//! using the in-process channel adapter and the in-memory store.

use std::collections::HashMap;
use std::sync::Arc;

use scenario_engine::adapter::memory::{ChannelAdapter, OutboundEvent};
use scenario_engine::driver::Driver;
use scenario_engine::scenario::{RawDocument, Scenario};
use scenario_engine::store::{MemoryStore, UserKey};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn id() -> String {
    Uuid::new_v4().to_string()
}

/// `start -> sendMessage -> getMessage(age: number) -> condition(age >= 18)
/// -> [sendMessage adult -> final] / [sendMessage minor -> final]`
fn age_gate_scenario() -> RawDocument {
    let start = id();
    let welcome = id();
    let ask_age = id();
    let gate = id();
    let adult_msg = id();
    let minor_msg = id();
    let adult_final = id();
    let minor_final = id();

    let doc = json!({
        "BotName": "AgeGate",
        "Start": start,
        "Final": adult_final,
        "GlobalVariables": [],
        "Blocks": [
            {"Block_id": start, "Type": "start", "Params": {}, "Connections": {"In": [], "Out": [welcome]}},
            {"Block_id": welcome, "Type": "sendMessage", "Params": {"message": "Hello ${name}!"}, "Connections": {"In": [start], "Out": [ask_age]}},
            {"Block_id": ask_age, "Type": "getMessage", "Params": {"message": "How old are you?", "var": "age", "type": "number"}, "Connections": {"In": [welcome], "Out": [gate]}},
            {"Block_id": gate, "Type": "condition", "Params": {"condition": "age >= 18"}, "Connections": {"In": [ask_age], "Out": [adult_msg, minor_msg]}},
            {"Block_id": adult_msg, "Type": "sendMessage", "Params": {"message": "Welcome, adult."}, "Connections": {"In": [gate], "Out": [adult_final]}},
            {"Block_id": minor_msg, "Type": "sendMessage", "Params": {"message": "Sorry, minors only see this."}, "Connections": {"In": [gate], "Out": [minor_final]}},
            {"Block_id": adult_final, "Type": "final", "Params": {}, "Connections": {"In": [adult_msg], "Out": []}},
            {"Block_id": minor_final, "Type": "final", "Params": {}, "Connections": {"In": [minor_msg], "Out": []}}
        ]
    });

    serde_json::from_value(doc).unwrap()
}

fn choice_scenario() -> RawDocument {
    let start = id();
    let choose = id();
    let yes_msg = id();
    let no_msg = id();
    let yes_final = id();
    let no_final = id();

    let doc = json!({
        "BotName": "Chooser",
        "Start": start,
        "Final": yes_final,
        "GlobalVariables": [],
        "Blocks": [
            {"Block_id": start, "Type": "start", "Params": {}, "Connections": {"In": [], "Out": [choose]}},
            {"Block_id": choose, "Type": "choice", "Params": {
                "prompt": "Continue?",
                "var": "answer",
                "options": [
                    {"id": "yes", "label": "Yes", "value": "yes"},
                    {"id": "no", "label": "No", "value": "no"}
                ]
            }, "Connections": {"In": [start], "Out": [yes_msg, no_msg]}},
            {"Block_id": yes_msg, "Type": "sendMessage", "Params": {"message": "Great, continuing."}, "Connections": {"In": [choose], "Out": [yes_final]}},
            {"Block_id": no_msg, "Type": "sendMessage", "Params": {"message": "Okay, stopping."}, "Connections": {"In": [choose], "Out": [no_final]}},
            {"Block_id": yes_final, "Type": "final", "Params": {}, "Connections": {"In": [yes_msg], "Out": []}},
            {"Block_id": no_final, "Type": "final", "Params": {}, "Connections": {"In": [no_msg], "Out": []}}
        ]
    });

    serde_json::from_value(doc).unwrap()
}

#[tokio::test]
async fn full_walkthrough_routes_adults_through_the_true_branch() {
    let scenario = Arc::new(Scenario::validate(age_gate_scenario()).unwrap());
    let (adapter, mut events) = ChannelAdapter::new();
    let driver = Driver::new(scenario, MemoryStore::new(), adapter);
    let user = UserKey::new("u1");

    driver.start(user.clone(), HashMap::new()).await;

    // Welcome message, then the age prompt (auto-advance stops at getMessage).
    assert!(matches!(events.recv().await.unwrap(), OutboundEvent::Message { .. }));
    assert!(matches!(events.recv().await.unwrap(), OutboundEvent::AskText { .. }));

    driver.resume(user.clone(), "30".to_string()).await;

    match events.recv().await.unwrap() {
        OutboundEvent::Message { text, .. } => assert_eq!(text, "Welcome, adult."),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn full_walkthrough_routes_minors_through_the_false_branch() {
    let scenario = Arc::new(Scenario::validate(age_gate_scenario()).unwrap());
    let (adapter, mut events) = ChannelAdapter::new();
    let driver = Driver::new(scenario, MemoryStore::new(), adapter);
    let user = UserKey::new("u2");

    driver.start(user.clone(), HashMap::new()).await;
    events.recv().await.unwrap();
    events.recv().await.unwrap();

    driver.resume(user.clone(), "12".to_string()).await;

    match events.recv().await.unwrap() {
        OutboundEvent::Message { text, .. } => assert_eq!(text, "Sorry, minors only see this."),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_age_reply_is_rejected_without_advancing() {
    let scenario = Arc::new(Scenario::validate(age_gate_scenario()).unwrap());
    let (adapter, mut events) = ChannelAdapter::new();
    let driver = Driver::new(scenario, MemoryStore::new(), adapter);
    let user = UserKey::new("u3");

    driver.start(user.clone(), HashMap::new()).await;
    events.recv().await.unwrap();
    events.recv().await.unwrap();

    driver.resume(user.clone(), "not a number".to_string()).await;
    match events.recv().await.unwrap() {
        OutboundEvent::Message { text, .. } => assert!(text.contains("doesn't look right")),
        other => panic!("unexpected event: {other:?}"),
    }

    // The session should still be awaiting a valid age, not have moved on.
    driver.resume(user.clone(), "22".to_string()).await;
    match events.recv().await.unwrap() {
        OutboundEvent::Message { text, .. } => assert_eq!(text, "Welcome, adult."),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn choice_routes_by_selected_option_id() {
    let scenario = Arc::new(Scenario::validate(choice_scenario()).unwrap());
    let (adapter, mut events) = ChannelAdapter::new();
    let driver = Driver::new(scenario, MemoryStore::new(), adapter);
    let user = UserKey::new("u4");

    driver.start(user.clone(), HashMap::new()).await;
    match events.recv().await.unwrap() {
        OutboundEvent::AskChoice { options, .. } => {
            assert_eq!(options, vec![("yes".to_string(), "Yes".to_string()), ("no".to_string(), "No".to_string())]);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    driver.resume(user.clone(), "no".to_string()).await;
    match events.recv().await.unwrap() {
        OutboundEvent::Message { text, .. } => assert_eq!(text, "Okay, stopping."),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_choice_option_gets_a_stale_hint_and_stays_active() {
    let scenario = Arc::new(Scenario::validate(choice_scenario()).unwrap());
    let (adapter, mut events) = ChannelAdapter::new();
    let driver = Driver::new(scenario, MemoryStore::new(), adapter);
    let user = UserKey::new("u5");

    driver.start(user.clone(), HashMap::new()).await;
    events.recv().await.unwrap();

    driver.resume(user.clone(), "maybe".to_string()).await;
    match events.recv().await.unwrap() {
        OutboundEvent::Message { text, .. } => assert!(text.contains("not one of the options")),
        other => panic!("unexpected event: {other:?}"),
    }

    driver.resume(user.clone(), "yes".to_string()).await;
    match events.recv().await.unwrap() {
        OutboundEvent::Message { text, .. } => assert_eq!(text, "Great, continuing."),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn resuming_an_inactive_session_sends_a_restart_hint() {
    let scenario = Arc::new(Scenario::validate(choice_scenario()).unwrap());
    let (adapter, mut events) = ChannelAdapter::new();
    let driver = Driver::new(scenario, MemoryStore::new(), adapter);
    let user = UserKey::new("u6");

    driver.start(user.clone(), HashMap::new()).await;
    events.recv().await.unwrap(); // ask_choice
    driver.resume(user.clone(), "yes".to_string()).await;
    events.recv().await.unwrap(); // "Great, continuing."
    events.recv().await.unwrap(); // the final block's collected-data summary

    driver.resume(user.clone(), "anything".to_string()).await;
    match events.recv().await.unwrap() {
        OutboundEvent::Message { text, .. } => assert!(text.contains("ended")),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn pre_cancelled_token_returns_without_running_any_block() {
    let scenario = Arc::new(Scenario::validate(age_gate_scenario()).unwrap());
    let (adapter, mut events) = ChannelAdapter::new();
    let driver = Driver::new(scenario, MemoryStore::new(), adapter);
    let user = UserKey::new("u8");

    let cancellation = CancellationToken::new();
    cancellation.cancel();
    driver
        .start_with_cancellation(user.clone(), HashMap::new(), cancellation)
        .await;

    // `advance_loop` checks cancellation before running the first block, so
    // nothing is ever sent and the loop returns immediately rather than
    // suspending on any block.
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn cancelling_mid_apirequest_routes_through_the_failure_branch() {
    let start = id();
    let call = id();
    let ok_final = id();
    let fail_msg = id();
    let fail_final = id();

    // Bound but never accepted: the TCP handshake completes into the
    // kernel backlog, but no HTTP response is ever written back, so the
    // outbound request stays in flight until the cancellation below
    // preempts it via the `tokio::select!` in `handle_api_request`.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = format!("http://{addr}/unreachable");

    let doc: RawDocument = serde_json::from_value(json!({
        "BotName": "Caller",
        "Start": start,
        "Final": ok_final,
        "GlobalVariables": [],
        "Blocks": [
            {"Block_id": start, "Type": "start", "Params": {}, "Connections": {"In": [], "Out": [call]}},
            {"Block_id": call, "Type": "apiRequest", "Params": {
                "url": url,
                "method": "GET",
                "headers": {},
                "variables": {}
            }, "Connections": {"In": [start], "Out": [ok_final, fail_msg]}},
            {"Block_id": fail_msg, "Type": "sendMessage", "Params": {"message": "Request failed."}, "Connections": {"In": [call], "Out": [fail_final]}},
            {"Block_id": ok_final, "Type": "final", "Params": {}, "Connections": {"In": [call], "Out": []}},
            {"Block_id": fail_final, "Type": "final", "Params": {}, "Connections": {"In": [fail_msg], "Out": []}}
        ]
    }))
    .unwrap();

    let scenario = Arc::new(Scenario::validate(doc).unwrap());
    let (adapter, mut events) = ChannelAdapter::new();
    let driver = Arc::new(Driver::new(scenario, MemoryStore::new(), adapter));
    let user = UserKey::new("u9");

    let cancellation = CancellationToken::new();
    let handle = tokio::spawn({
        let driver = driver.clone();
        let user = user.clone();
        let cancellation = cancellation.clone();
        async move {
            driver
                .start_with_cancellation(user, HashMap::new(), cancellation)
                .await;
        }
    });

    // Give the apiRequest handler a moment to actually dispatch and start
    // awaiting the response before cancelling mid-flight.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    cancellation.cancel();
    handle.await.unwrap();
    drop(listener);

    match events.recv().await.unwrap() {
        OutboundEvent::Message { text, .. } => assert_eq!(text, "Request failed."),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn starting_twice_resets_rather_than_duplicates() {
    let scenario = Arc::new(Scenario::validate(choice_scenario()).unwrap());
    let (adapter, mut events) = ChannelAdapter::new();
    let driver = Driver::new(scenario, MemoryStore::new(), adapter);
    let user = UserKey::new("u7");

    driver.start(user.clone(), HashMap::new()).await;
    events.recv().await.unwrap(); // ask_choice

    // A second `start` mid-dialog should reset the session back to the
    // beginning rather than spawn a second, independent dialog.
    driver.start(user.clone(), HashMap::new()).await;
    match events.recv().await.unwrap() {
        OutboundEvent::AskChoice { .. } => {}
        other => panic!("expected a fresh prompt after restart, got: {other:?}"),
    }
}
