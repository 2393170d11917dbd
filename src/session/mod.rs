//! Live server-side state for one connection.
//!
//! ```text
//! Node::set_property ──→ queue ──(yield)──→ flush ──→ {"updates": [...]}
//!        ↑                                                   │
//!        └──── dispatch_inbound ←── {"event": {...}} ←───────┘
//! ```
//!
//! A session owns one tree rooted at a RootContainer, the id registry used
//! to route inbound events, the outbound queue and its flush scheduler, and
//! the navigator multiplexing pages over the tree.

mod inner;
mod error;
mod navigator;
mod transport;

use std::future::Future;
use std::sync::Arc;

pub use error::SessionError;
pub use navigator::Navigator;
pub use transport::{ChannelTransport, SendFuture, Transport, TransportError, TransportId};

use crate::protocol::{ChangeRecord, Inbound};
use crate::tree::{Node, NodeId, NodeKind, NodeSnapshot, Tracker};
use self::inner::{FlushDriver, SessionCore};

#[derive(Clone)]
pub struct Session {
    core: Arc<SessionCore>,
    root: Node,
    navigator: Arc<Navigator>,
}

impl Session {
    pub fn new() -> Self {
        let label = uuid::Uuid::new_v4().simple().to_string();
        let core = SessionCore::new(label);
        let root = Node::root();
        let tracker: Arc<dyn Tracker> = core.clone();
        root.bind(&tracker);
        let navigator = Arc::new(Navigator::new(root.clone()));
        Self {
            core,
            root,
            navigator,
        }
    }

    /// Short identifier used in logs.
    pub fn label(&self) -> &str {
        &self.core.label
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Look up a node of this session's tree by id.
    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.core.lookup(id)
    }

    /// Number of nodes currently reachable through the registry.
    pub fn node_count(&self) -> usize {
        self.core.registered()
    }

    /// Records waiting for the next flush.
    pub fn pending(&self) -> Vec<ChangeRecord> {
        self.core.pending()
    }

    pub fn transport_count(&self) -> usize {
        self.core.transport_count()
    }

    /// Drain the queue now instead of waiting for the scheduled flush.
    pub async fn flush(&self) {
        self.core.flush().await;
    }

    /// Move this session's scheduled flushes onto the caller's task.
    ///
    /// Takes effect immediately: from here on a scheduled flush waits for
    /// the returned future instead of being spawned. Poll it in the same
    /// `select!` as the work that dispatches the session's events, so a
    /// flush only runs while that work is parked at an `.await`. The future
    /// never completes; dropping it restores spawned flushes.
    pub fn flush_loop(&self) -> impl Future<Output = ()> + Send + 'static {
        let driver = FlushDriver::attach(self.core.clone());
        async move { driver.run().await }
    }

    /// Register a transport and send it the initial state.
    pub async fn connect(&self, transport: Arc<dyn Transport>) -> Result<TransportId, SessionError> {
        let root = self.root.clone();
        self.core
            .connect(transport, move || visible_snapshots(&root))
            .await
    }

    pub fn disconnect(&self, id: TransportId) -> bool {
        self.core.disconnect(id)
    }

    /// Tear the session down: transports, queue, registry and handlers.
    pub fn close(&self) {
        self.core.close();
        tracing::debug!(session = %self.label(), "session closed");
    }

    /// Decode and route one inbound text message.
    pub async fn dispatch_inbound(&self, text: &str) -> Result<(), SessionError> {
        let inbound = Inbound::decode(text)?;
        self.dispatch(inbound).await
    }

    pub async fn dispatch(&self, inbound: Inbound) -> Result<(), SessionError> {
        match inbound {
            Inbound::Navigate { path } => self.navigator.navigate_to(&path).await,
            Inbound::Back => self.navigator.navigate_back().await,
            Inbound::Node { id, event, data } => {
                let Some(node) = self.core.lookup(&id) else {
                    return Err(SessionError::UnknownNode {
                        id: id.as_str().to_string(),
                    });
                };
                tracing::debug!(session = %self.label(), node = %id, event = %event, "dispatching event");
                node.dispatch(&event, data).await?;

                if node.kind() == NodeKind::NavLink && event == "click" {
                    let path = node.get_str("path");
                    if self.navigator.page(&path).is_some() {
                        self.navigator.navigate_to(&path).await?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshots of every node the renderer should materialize on connect:
/// the whole tree, except that hidden pages are sent without their subtree.
fn visible_snapshots(root: &Node) -> Vec<NodeSnapshot> {
    let mut out = Vec::new();
    collect_visible(root, &mut out);
    out
}

fn collect_visible(node: &Node, out: &mut Vec<NodeSnapshot>) {
    out.push(node.snapshot());
    for child in node.children() {
        if child.kind() == NodeKind::Page && !child.is_visible() {
            out.push(child.snapshot());
            continue;
        }
        collect_visible(&child, out);
    }
}
