use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::mpsc;

pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),
}

/// Outbound half of a connection, as seen by a session.
pub trait Transport: Send + Sync {
    fn send(&self, message: String) -> SendFuture<'_>;
}

/// Identifies a transport registered with a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(pub(crate) u64);

/// Transport backed by a bounded channel; the receiving end is drained by
/// whatever owns the real socket.
#[derive(Clone)]
pub struct ChannelTransport {
    sender: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: String) -> SendFuture<'_> {
        Box::pin(async move {
            self.sender
                .send(message)
                .await
                .map_err(|_| TransportError::Closed)
        })
    }
}
