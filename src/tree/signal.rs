//! Named, ordered subscriber lists used to deliver UI events to callbacks.
//!
//! Every subscriber is normalized into the same boxed-future shape when it
//! is connected, so `emit` never has to care whether a handler suspends.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use thiserror::Error;

use super::node::Node;

/// Future returned by a normalized subscriber.
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

type Handler = Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>;

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// Handle returned by [`Signal::connect`], used to disconnect later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }
}

/// An event delivered to subscribers.
#[derive(Debug, Clone)]
pub struct Event {
    /// Node the event was dispatched on.
    pub sender: Node,
    /// Event name ("click", "change", ...).
    pub kind: String,
    /// Payload sent by the renderer.
    pub data: Map<String, Value>,
}

impl Event {
    pub fn new(sender: Node, kind: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            sender,
            kind: kind.into(),
            data,
        }
    }

    /// The `value` field of the payload, if any.
    pub fn value(&self) -> Option<&Value> {
        self.data.get("value")
    }
}

/// A subscriber failed while a signal was being emitted.
#[derive(Debug, Error)]
#[error("subscriber #{index} of signal '{signal}' failed: {source}")]
pub struct SignalError {
    pub signal: String,
    pub index: usize,
    #[source]
    pub source: anyhow::Error,
}

pub struct Signal {
    name: String,
    handlers: Mutex<Vec<(SubscriptionId, Handler)>>,
}

impl Signal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe an asynchronous handler.
    pub fn connect<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: Handler =
            Arc::new(move |event: Event| -> HandlerFuture { Box::pin(handler(event)) });
        self.push(handler)
    }

    /// Subscribe a handler that completes without suspending.
    pub fn connect_sync<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(move |event: Event| -> HandlerFuture {
            Box::pin(std::future::ready(handler(&event)))
        });
        self.push(handler)
    }

    fn push(&self, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.handlers.lock().push((id, handler));
        id
    }

    /// Remove a subscriber. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }

    pub(crate) fn clear(&self) {
        self.handlers.lock().clear();
    }

    /// Invoke every subscriber in subscription order, awaiting each before
    /// starting the next. Stops at the first failure.
    ///
    /// The subscriber list is captured before the first call, so handlers
    /// may connect or disconnect without affecting the running emit.
    pub async fn emit(&self, event: Event) -> Result<(), SignalError> {
        let handlers: Vec<Handler> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for (index, handler) in handlers.into_iter().enumerate() {
            handler(event.clone())
                .await
                .map_err(|source| SignalError {
                    signal: self.name.clone(),
                    index,
                    source,
                })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("subscribers", &self.len())
            .finish()
    }
}
