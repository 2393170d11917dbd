//! JSON messages exchanged with the renderer over one connection.
//!
//! ```text
//! server → client   {"initialState": {"widgets": [NodeSnapshot, ...]}}
//! server → client   {"updates": [ChangeRecord, ...]}
//! client → server   {"event": {"id": "...", "type": "...", "data": {...}}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tree::{NodeId, NodeSnapshot};

/// Reserved event target for navigation requests.
pub const NAVIGATION_TARGET: &str = "navigation";

/// One entry of an outbound `updates` batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChangeRecord {
    Update {
        id: NodeId,
        property: String,
        value: Value,
    },
    Remove {
        id: NodeId,
    },
    Navigation {
        path: String,
        title: String,
    },
    PageWidgets {
        page_path: String,
        widgets: Vec<NodeSnapshot>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerMessage {
    InitialState { widgets: Vec<NodeSnapshot> },
    Updates(Vec<ChangeRecord>),
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientMessage {
    pub event: ClientEvent,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// A decoded, routed inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Navigate { path: String },
    Back,
    Node {
        id: NodeId,
        event: String,
        data: Map<String, Value>,
    },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("navigation request has no string 'path'")]
    MissingPath,

    #[error("unsupported navigation action '{0}'")]
    UnknownNavigationAction(String),
}

impl Inbound {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let message: ClientMessage = serde_json::from_str(text)?;
        Self::route(message.event)
    }

    fn route(event: ClientEvent) -> Result<Self, ProtocolError> {
        if event.id != NAVIGATION_TARGET {
            return Ok(Inbound::Node {
                id: NodeId::from(event.id),
                event: event.kind,
                data: event.data,
            });
        }

        match event.kind.as_str() {
            "navigate" => match event.data.get("path") {
                Some(Value::String(path)) => Ok(Inbound::Navigate { path: path.clone() }),
                _ => Err(ProtocolError::MissingPath),
            },
            "back" => Ok(Inbound::Back),
            _ => Err(ProtocolError::UnknownNavigationAction(event.kind)),
        }
    }
}
