//! End-to-end synchronization between a session and a recording transport.

mod common;

use std::sync::Arc;

use common::{connect_recorder, event, navigate, settle};
use livetree::protocol::ChangeRecord;
use livetree::session::{Session, SessionError};
use livetree::tree::{Node, NodeKind};
use parking_lot::Mutex;
use serde_json::json;

/// `home` (default) with a label, `about` with a label of its own.
fn two_pages(session: &Session) -> (Node, Node) {
    let home_label = Node::label("home body");
    let about_label = Node::label("about body");
    let navigator = session.navigator();
    {
        let home_label = home_label.clone();
        navigator
            .register("home", "Home", move |page| Ok(page.attach(&home_label)?))
            .unwrap();
    }
    {
        let about_label = about_label.clone();
        navigator
            .register("about", "About", move |page| Ok(page.attach(&about_label)?))
            .unwrap();
    }
    (home_label, about_label)
}

#[tokio::test]
async fn initial_state_then_navigation_batch() {
    let session = Session::new();
    let (home_label, about_label) = two_pages(&session);
    session.navigator().initialize().await.unwrap();

    let transport = connect_recorder(&session).await;
    let widgets = transport.initial_widgets();

    let root = widgets
        .iter()
        .find(|w| w.kind == NodeKind::RootContainer)
        .expect("root in initial state");
    assert_eq!(&root.id, session.root().id());

    let home = session.navigator().page("home").unwrap();
    let home_snapshot = widgets.iter().find(|w| &w.id == home.id()).unwrap();
    assert!(home_snapshot.is_visible());
    assert!(widgets.iter().any(|w| &w.id == home_label.id()));
    assert!(!widgets.iter().any(|w| &w.id == about_label.id()));

    session.dispatch_inbound(&navigate("about")).await.unwrap();
    settle().await;

    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    let navigation = batch
        .iter()
        .position(|r| matches!(r, ChangeRecord::Navigation { path, .. } if path == "about"))
        .expect("navigation record");
    match &batch[navigation + 1] {
        ChangeRecord::PageWidgets { page_path, widgets } => {
            assert_eq!(page_path, "about");
            assert!(widgets.iter().any(|w| &w.id == about_label.id()));
        }
        other => panic!("expected page_widgets after navigation, got {other:?}"),
    }
}

#[tokio::test]
async fn text_input_change_sets_value_and_emits_once() {
    let session = Session::new();
    let input = Node::text_input("", "type here");
    session.root().attach(&input).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = seen.clone();
        input.on_change(move |event| {
            let seen = seen.clone();
            async move {
                seen.lock().push(event.value().cloned());
                Ok(())
            }
        });
    }

    let transport = connect_recorder(&session).await;
    session
        .dispatch_inbound(&event(input.id().as_str(), "change", json!({"value": "x"})))
        .await
        .unwrap();
    settle().await;

    assert_eq!(input.get_property("value"), Some(json!("x")));
    assert_eq!(*seen.lock(), vec![Some(json!("x"))]);
    assert_eq!(
        transport.batches(),
        vec![vec![ChangeRecord::Update {
            id: input.id().clone(),
            property: "value".into(),
            value: json!("x"),
        }]]
    );
}

#[tokio::test]
async fn handler_mutations_arrive_as_one_batch_in_order() {
    let session = Session::new();
    let status = Node::label("idle");
    let count = Node::label("0");
    let button = Node::button("go");
    for node in [&status, &count, &button] {
        session.root().attach(node).unwrap();
    }
    {
        let status = status.clone();
        let count = count.clone();
        button.on_click(move |_| {
            status.set_text("working");
            for n in 1..=3 {
                count.set_text(&n.to_string());
            }
            status.set_text("done");
            async { Ok(()) }
        });
    }

    let transport = connect_recorder(&session).await;
    session
        .dispatch_inbound(&event(button.id().as_str(), "click", json!({})))
        .await
        .unwrap();
    settle().await;

    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    let texts: Vec<_> = batches[0]
        .iter()
        .map(|record| match record {
            ChangeRecord::Update { value, .. } => value.as_str().unwrap().to_string(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(texts, vec!["working", "1", "2", "3", "done"]);
}

#[tokio::test]
async fn malformed_messages_are_rejected_without_side_effects() {
    let session = Session::new();
    two_pages(&session);
    session.navigator().initialize().await.unwrap();
    let transport = connect_recorder(&session).await;

    for bad in [
        "not json",
        r#"{"event":{"type":"click"}}"#,
        r#"{"event":{"id":"navigation","type":"navigate","data":{}}}"#,
    ] {
        let err = session.dispatch_inbound(bad).await.unwrap_err();
        assert!(err.is_protocol(), "{bad} gave {err}");
    }
    let err = session.dispatch_inbound(&navigate("missing")).await.unwrap_err();
    assert!(matches!(err, SessionError::UnknownPath { .. }));

    settle().await;
    assert!(transport.batches().is_empty());
    assert_eq!(session.navigator().current_path().as_deref(), Some("home"));
}

#[tokio::test]
async fn back_event_returns_to_previous_page() {
    let session = Session::new();
    two_pages(&session);
    session.navigator().initialize().await.unwrap();
    let transport = connect_recorder(&session).await;

    session.dispatch_inbound(&navigate("about")).await.unwrap();
    session
        .dispatch_inbound(&event("navigation", "back", json!({})))
        .await
        .unwrap();
    settle().await;

    assert_eq!(session.navigator().current_path().as_deref(), Some("home"));
    let paths: Vec<_> = transport
        .batches()
        .concat()
        .into_iter()
        .filter_map(|r| match r {
            ChangeRecord::Navigation { path, .. } => Some(path),
            _ => None,
        })
        .collect();
    assert_eq!(paths, vec!["about", "home"]);
}

#[tokio::test]
async fn failed_send_loses_only_that_batch() {
    let session = Session::new();
    let label = Node::label("a");
    session.root().attach(&label).unwrap();
    let transport = connect_recorder(&session).await;

    transport.fail_sends();
    label.set_text("lost");
    settle().await;
    assert!(session.pending().is_empty());

    let healthy = connect_recorder(&session).await;
    label.set_text("kept");
    settle().await;

    assert!(transport.batches().is_empty());
    assert_eq!(
        healthy.batches(),
        vec![vec![ChangeRecord::Update {
            id: label.id().clone(),
            property: "text".into(),
            value: json!("kept"),
        }]]
    );
}

#[tokio::test]
async fn closed_session_stops_tracking() {
    let session = Session::new();
    let label = Node::label("a");
    session.root().attach(&label).unwrap();
    let id = label.id().clone();

    session.close();
    assert!(session.node(&id).is_none());
    assert_eq!(session.transport_count(), 0);

    drop(session);
    assert!(!label.is_bound());
}
