//! Change tracking and the flush protocol.
//!
//! Every record produced by a bound tree lands in one ordered queue. The
//! first record after a flush schedules the next one; the scheduled flush
//! yields once before draining, so everything recorded in the same
//! synchronous run ends up in one `updates` message.
//!
//! A scheduled flush runs on the session's [`FlushDriver`] when one is
//! attached, which keeps it on the task that also dispatches the session's
//! events. Without a driver it is spawned on the current runtime; that is
//! only single-batch on a current-thread runtime, where nothing else can
//! run until the recording task yields.
//!
//! Pending records are kept while no transport is connected. A connecting
//! transport receives a full snapshot instead, which supersedes them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::protocol::{ChangeRecord, ServerMessage};
use crate::session::error::SessionError;
use crate::session::transport::{Transport, TransportId};
use crate::tree::{Node, NodeId, NodeSnapshot, Tracker};

pub(crate) struct SessionCore {
    pub(crate) label: String,
    this: Weak<SessionCore>,
    registry: Mutex<HashMap<NodeId, Node>>,
    queue: Mutex<Vec<ChangeRecord>>,
    flush_scheduled: AtomicBool,
    driven: AtomicBool,
    flush_wakeup: Notify,
    transports: Mutex<Vec<(TransportId, Arc<dyn Transport>)>>,
    next_transport: AtomicU64,
    /// Serializes batches on the wire: batch N finishes sending before
    /// batch N+1 is drained.
    send_lock: tokio::sync::Mutex<()>,
}

impl SessionCore {
    pub(crate) fn new(label: String) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            label,
            this: this.clone(),
            registry: Mutex::new(HashMap::new()),
            queue: Mutex::new(Vec::new()),
            flush_scheduled: AtomicBool::new(false),
            driven: AtomicBool::new(false),
            flush_wakeup: Notify::new(),
            transports: Mutex::new(Vec::new()),
            next_transport: AtomicU64::new(1),
            send_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub(crate) fn lookup(&self, id: &NodeId) -> Option<Node> {
        self.registry.lock().get(id).cloned()
    }

    pub(crate) fn registered(&self) -> usize {
        self.registry.lock().len()
    }

    pub(crate) fn pending(&self) -> Vec<ChangeRecord> {
        self.queue.lock().clone()
    }

    pub(crate) fn transport_count(&self) -> usize {
        self.transports.lock().len()
    }

    pub(crate) fn enqueue(&self, record: ChangeRecord) {
        self.queue.lock().push(record);
        self.schedule_flush();
    }

    /// Arrange for `flush` to run once the current task yields. At most one
    /// flush is scheduled at a time.
    fn schedule_flush(&self) {
        if self.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.driven.load(Ordering::SeqCst) {
            self.flush_wakeup.notify_one();
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.flush_scheduled.store(false, Ordering::SeqCst);
            tracing::debug!(
                session = %self.label,
                "no async runtime; records stay queued until an explicit flush"
            );
            return;
        };

        let this = self.this.clone();
        runtime.spawn(async move {
            tokio::task::yield_now().await;
            if let Some(core) = this.upgrade() {
                core.flush().await;
            }
        });
    }

    /// Drain the queue into one `updates` message and fan it out to every
    /// transport. A failed send loses the batch for that transport.
    pub(crate) async fn flush(&self) {
        let _sending = self.send_lock.lock().await;
        self.flush_scheduled.store(false, Ordering::SeqCst);

        let transports: Vec<Arc<dyn Transport>> = self
            .transports
            .lock()
            .iter()
            .map(|(_, transport)| transport.clone())
            .collect();
        if transports.is_empty() {
            tracing::trace!(
                session = %self.label,
                pending = self.queue.lock().len(),
                "no transport connected; keeping pending records"
            );
            return;
        }

        let batch = std::mem::take(&mut *self.queue.lock());
        if batch.is_empty() {
            return;
        }

        let count = batch.len();
        let message = match ServerMessage::Updates(batch).to_json() {
            Ok(message) => message,
            Err(err) => {
                tracing::error!(session = %self.label, error = %err, "failed to encode update batch");
                return;
            }
        };

        let results = join_all(
            transports
                .iter()
                .map(|transport| transport.send(message.clone())),
        )
        .await;

        let failed = results.iter().filter(|result| result.is_err()).count();
        for err in results.into_iter().filter_map(Result::err) {
            tracing::error!(session = %self.label, error = %err, "failed to send update batch");
        }
        tracing::debug!(session = %self.label, records = count, failed, "flushed update batch");
    }

    /// Deliver the initial state to a new transport and register it.
    ///
    /// `widgets` is evaluated under the queue lock; when no other transport
    /// is connected the pending queue is discarded, since the snapshot
    /// already reflects it.
    pub(crate) async fn connect<F>(
        &self,
        transport: Arc<dyn Transport>,
        widgets: F,
    ) -> Result<TransportId, SessionError>
    where
        F: FnOnce() -> Vec<NodeSnapshot>,
    {
        let _sending = self.send_lock.lock().await;

        let widgets = {
            let mut queue = self.queue.lock();
            let widgets = widgets();
            if self.transports.lock().is_empty() {
                queue.clear();
            }
            widgets
        };

        let count = widgets.len();
        let message = ServerMessage::InitialState { widgets }.to_json()?;
        transport.send(message).await?;

        let id = TransportId(self.next_transport.fetch_add(1, Ordering::Relaxed));
        self.transports.lock().push((id, transport));
        tracing::info!(session = %self.label, widgets = count, "transport connected; initial state sent");
        Ok(id)
    }

    pub(crate) fn disconnect(&self, id: TransportId) -> bool {
        let mut transports = self.transports.lock();
        let before = transports.len();
        transports.retain(|(existing, _)| *existing != id);
        transports.len() != before
    }

    /// Drop every transport, registry entry and pending record.
    pub(crate) fn close(&self) {
        self.transports.lock().clear();
        self.queue.lock().clear();
        let nodes: Vec<Node> = self.registry.lock().drain().map(|(_, node)| node).collect();
        for node in nodes {
            node.clear_signals();
        }
    }
}

/// Runs a session's scheduled flushes on whichever task polls [`run`].
///
/// Dropping the driver hands scheduling back to the runtime.
///
/// [`run`]: FlushDriver::run
pub(crate) struct FlushDriver {
    core: Arc<SessionCore>,
}

impl FlushDriver {
    pub(crate) fn attach(core: Arc<SessionCore>) -> Self {
        core.driven.store(true, Ordering::SeqCst);
        if core.flush_scheduled.load(Ordering::SeqCst) {
            core.flush_wakeup.notify_one();
        }
        Self { core }
    }

    pub(crate) async fn run(&self) {
        loop {
            self.core.flush_wakeup.notified().await;
            tokio::task::yield_now().await;
            self.core.flush().await;
        }
    }
}

impl Drop for FlushDriver {
    fn drop(&mut self) {
        self.core.driven.store(false, Ordering::SeqCst);
        // A wakeup nobody will consume; let the next record schedule again.
        self.core.flush_scheduled.store(false, Ordering::SeqCst);
    }
}

impl Tracker for SessionCore {
    fn record(&self, record: ChangeRecord) {
        self.enqueue(record);
    }

    fn register(&self, nodes: &[Node]) {
        let mut registry = self.registry.lock();
        for node in nodes {
            registry.insert(node.id().clone(), node.clone());
        }
    }

    fn unregister(&self, nodes: &[Node]) {
        let mut registry = self.registry.lock();
        for node in nodes {
            registry.remove(node.id());
        }
    }
}
