//! Shared test utilities.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use livetree::protocol::{ChangeRecord, ServerMessage};
use livetree::session::{SendFuture, Session, Transport, TransportError};
use livetree::tree::NodeSnapshot;
use parking_lot::Mutex;

/// Transport that keeps every outbound message in memory.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every following send fail.
    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn raw(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn messages(&self) -> Vec<ServerMessage> {
        self.raw()
            .iter()
            .map(|text| serde_json::from_str(text).expect("server sent invalid JSON"))
            .collect()
    }

    pub fn initial_widgets(&self) -> Vec<NodeSnapshot> {
        self.messages()
            .into_iter()
            .find_map(|message| match message {
                ServerMessage::InitialState { widgets } => Some(widgets),
                ServerMessage::Updates(_) => None,
            })
            .expect("no initial state sent")
    }

    pub fn batches(&self) -> Vec<Vec<ChangeRecord>> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                ServerMessage::Updates(records) => Some(records),
                ServerMessage::InitialState { .. } => None,
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, message: String) -> SendFuture<'_> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::Send("recording transport set to fail".into()));
            }
            self.sent.lock().push(message);
            Ok(())
        })
    }
}

/// Connect a fresh recording transport to `session`.
pub async fn connect_recorder(session: &Session) -> Arc<RecordingTransport> {
    let transport = RecordingTransport::new();
    session
        .connect(transport.clone())
        .await
        .expect("initial state delivered");
    transport
}

/// Let scheduled flushes run.
pub async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

pub fn navigate(path: &str) -> String {
    serde_json::json!({"event": {"id": "navigation", "type": "navigate", "data": {"path": path}}})
        .to_string()
}

pub fn event(id: &str, kind: &str, data: serde_json::Value) -> String {
    serde_json::json!({"event": {"id": id, "type": kind, "data": data}}).to_string()
}
