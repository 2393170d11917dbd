//! Session error taxonomy.
//!
//! None of these are fatal: the connection driver reports them and keeps
//! the session running.

use thiserror::Error;

use crate::protocol::ProtocolError;
use crate::session::transport::TransportError;
use crate::tree::{SignalError, TreeError};

#[derive(Debug, Error)]
pub enum SessionError {
    /// Inbound payload could not be decoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Event addressed to an id the session does not know
    #[error("node '{id}' is not registered with this session")]
    UnknownNode { id: String },

    /// Navigation to a path that was never registered
    #[error("no page registered under '{path}'")]
    UnknownPath { path: String },

    #[error("a page is already registered under '{path}'")]
    DuplicatePath { path: String },

    #[error("navigation has no default page")]
    NoDefaultPage,

    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A user handler failed during dispatch
    #[error("event handler failed: {0}")]
    Handler(#[from] SignalError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SessionError {
    /// Stable classifier used as a log field.
    pub fn error_type(&self) -> &'static str {
        match self {
            SessionError::Protocol(_) => "protocol_error",
            SessionError::UnknownNode { .. } => "unknown_node",
            SessionError::UnknownPath { .. } => "unknown_path",
            SessionError::DuplicatePath { .. } => "duplicate_path",
            SessionError::NoDefaultPage => "no_default_page",
            SessionError::Tree(_) => "tree_error",
            SessionError::Handler(_) => "handler_error",
            SessionError::Transport(_) => "transport_error",
            SessionError::Encode(_) => "encode_error",
        }
    }

    /// Whether the error came from the renderer's input rather than from
    /// application code.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            SessionError::Protocol(_)
                | SessionError::UnknownNode { .. }
                | SessionError::UnknownPath { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_protocol_errors() {
        let err = SessionError::UnknownNode { id: "x".into() };
        assert_eq!(err.error_type(), "unknown_node");
        assert!(err.is_protocol());

        let err = SessionError::NoDefaultPage;
        assert_eq!(err.error_type(), "no_default_page");
        assert!(!err.is_protocol());
    }
}
