use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::signal::{Event, Signal, SignalError, SubscriptionId};
use super::snapshot::NodeSnapshot;
use super::Tracker;
use crate::protocol::ChangeRecord;

/// Process-unique node identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Closed set of node kinds understood by both ends of the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    RootContainer,
    Container,
    Page,
    Label,
    Button,
    TextInput,
    NavLink,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::RootContainer => "RootContainer",
            NodeKind::Container => "Container",
            NodeKind::Page => "Page",
            NodeKind::Label => "Label",
            NodeKind::Button => "Button",
            NodeKind::TextInput => "TextInput",
            NodeKind::NavLink => "NavLink",
        }
    }

    /// Whether nodes of this kind may have children.
    pub fn holds_children(self) -> bool {
        match self {
            NodeKind::RootContainer | NodeKind::Container | NodeKind::Page => true,
            NodeKind::Label | NodeKind::Button | NodeKind::TextInput | NodeKind::NavLink => false,
        }
    }

    /// Whether a `change` event mirrors its `value` into the node before
    /// subscribers run.
    fn mirrors_change_value(self) -> bool {
        match self {
            NodeKind::TextInput => true,
            NodeKind::RootContainer
            | NodeKind::Container
            | NodeKind::Page
            | NodeKind::Label
            | NodeKind::Button
            | NodeKind::NavLink => false,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("attaching node '{child}' under '{parent}' would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },

    #[error("a RootContainer cannot be attached under another node")]
    RootNotAttachable,

    #[error("node '{parent}' is a {kind} and cannot hold children")]
    NotAContainer { parent: NodeId, kind: NodeKind },
}

/// A handle to one element of the UI tree.
///
/// Cloning is cheap and yields another handle to the same node. Children are
/// owned by their parent; the parent link is weak.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    id: NodeId,
    kind: NodeKind,
    properties: Mutex<Map<String, Value>>,
    parent: Mutex<Weak<NodeInner>>,
    children: Mutex<Vec<Node>>,
    signals: Mutex<HashMap<String, Arc<Signal>>>,
    tracker: Mutex<Option<Weak<dyn Tracker>>>,
}

impl Node {
    pub(crate) fn with_properties(kind: NodeKind, properties: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id: NodeId::generate(),
                kind,
                properties: Mutex::new(properties),
                parent: Mutex::new(Weak::new()),
                children: Mutex::new(Vec::new()),
                signals: Mutex::new(HashMap::new()),
                tracker: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.inner.id
    }

    pub fn kind(&self) -> NodeKind {
        self.inner.kind
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Overwrite a property and record the change.
    ///
    /// Writing the same value again still produces an update record.
    pub fn set_property(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        self.inner
            .properties
            .lock()
            .insert(name.to_string(), value.clone());

        if let Some(tracker) = self.tracker() {
            tracker.record(ChangeRecord::Update {
                id: self.id().clone(),
                property: name.to_string(),
                value,
            });
        }
    }

    pub fn get_property(&self, name: &str) -> Option<Value> {
        self.inner.properties.lock().get(name).cloned()
    }

    /// String view of a property, empty when missing or not a string.
    pub fn get_str(&self, name: &str) -> String {
        match self.inner.properties.lock().get(name) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        }
    }

    pub fn parent(&self) -> Option<Node> {
        self.inner
            .parent
            .lock()
            .upgrade()
            .map(|inner| Node { inner })
    }

    pub fn children(&self) -> Vec<Node> {
        self.inner.children.lock().clone()
    }

    /// Append `child`, moving it out of its current parent first.
    ///
    /// When this node is bound and sits inside a visible page, the page's
    /// contents are re-sent as one `page_widgets` record so the renderer
    /// picks up the new (or moved) subtree.
    pub fn attach(&self, child: &Node) -> Result<(), TreeError> {
        if child.kind() == NodeKind::RootContainer {
            return Err(TreeError::RootNotAttachable);
        }
        if !self.kind().holds_children() {
            return Err(TreeError::NotAContainer {
                parent: self.id().clone(),
                kind: self.kind(),
            });
        }

        let mut cursor = Some(self.clone());
        while let Some(ancestor) = cursor {
            if ancestor.ptr_eq(child) {
                return Err(TreeError::WouldCycle {
                    parent: self.id().clone(),
                    child: child.id().clone(),
                });
            }
            cursor = ancestor.parent();
        }

        if let Some(previous) = child.parent() {
            previous.detach(child);
        }

        *child.inner.parent.lock() = Arc::downgrade(&self.inner);
        self.inner.children.lock().push(child.clone());

        if let Some(tracker) = self.tracker() {
            child.bind(&tracker);
            if let Some(page) = self.enclosing_page().filter(Node::is_visible) {
                let widgets = page.subtree_snapshots();
                tracker.record(ChangeRecord::PageWidgets {
                    page_path: page.get_str("path"),
                    widgets,
                });
            }
        }
        Ok(())
    }

    /// This node or its nearest ancestor of kind Page.
    fn enclosing_page(&self) -> Option<Node> {
        let mut cursor = Some(self.clone());
        while let Some(node) = cursor {
            if node.kind() == NodeKind::Page {
                return Some(node);
            }
            cursor = node.parent();
        }
        None
    }

    /// Remove `child`. Records a single `remove` for the child only; the
    /// renderer drops the descendants with it.
    ///
    /// Returns `false` when `child` is not a direct child of this node.
    pub fn detach(&self, child: &Node) -> bool {
        {
            let mut children = self.inner.children.lock();
            let Some(position) = children.iter().position(|c| c.ptr_eq(child)) else {
                return false;
            };
            children.remove(position);
        }
        *child.inner.parent.lock() = Weak::new();

        if let Some(tracker) = self.tracker() {
            tracker.record(ChangeRecord::Remove {
                id: child.id().clone(),
            });
            child.unbind(tracker.as_ref());
        }
        true
    }

    /// The node and every descendant, parents before children.
    pub fn subtree(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        self.collect_subtree(&mut nodes);
        nodes
    }

    fn collect_subtree(&self, out: &mut Vec<Node>) {
        out.push(self.clone());
        for child in self.children() {
            child.collect_subtree(out);
        }
    }

    /// Point-in-time copy of this node.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id().clone(),
            kind: self.kind(),
            properties: self.inner.properties.lock().clone(),
            children: self
                .inner
                .children
                .lock()
                .iter()
                .map(|child| child.id().clone())
                .collect(),
        }
    }

    pub fn subtree_snapshots(&self) -> Vec<NodeSnapshot> {
        self.subtree().iter().map(Node::snapshot).collect()
    }

    /// The signal for `event`, created on first use.
    pub fn signal(&self, event: &str) -> Arc<Signal> {
        self.inner
            .signals
            .lock()
            .entry(event.to_string())
            .or_insert_with(|| Arc::new(Signal::new(event)))
            .clone()
    }

    pub fn on<F, Fut>(&self, event: &str, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.signal(event).connect(handler)
    }

    pub fn off(&self, event: &str, id: SubscriptionId) -> bool {
        let signal = self.inner.signals.lock().get(event).cloned();
        signal.is_some_and(|signal| signal.disconnect(id))
    }

    /// Deliver an event from the renderer to this node's subscribers.
    pub async fn dispatch(&self, event: &str, data: Map<String, Value>) -> Result<(), SignalError> {
        if event == "change" && self.kind().mirrors_change_value() {
            if let Some(value) = data.get("value") {
                self.set_property("value", value.clone());
            }
        }

        let signal = self.inner.signals.lock().get(event).cloned();
        let Some(signal) = signal else {
            tracing::trace!(node = %self.id(), event, "no subscribers");
            return Ok(());
        };
        signal.emit(Event::new(self.clone(), event, data)).await
    }

    /// Whether the node currently belongs to a live session.
    pub fn is_bound(&self) -> bool {
        self.tracker().is_some()
    }

    pub(crate) fn tracker(&self) -> Option<Arc<dyn Tracker>> {
        self.inner.tracker.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Bind this subtree to `tracker` and register every node with it.
    pub(crate) fn bind(&self, tracker: &Arc<dyn Tracker>) {
        let nodes = self.subtree();
        for node in &nodes {
            *node.inner.tracker.lock() = Some(Arc::downgrade(tracker));
        }
        tracker.register(&nodes);
    }

    fn unbind(&self, tracker: &dyn Tracker) {
        let nodes = self.subtree();
        for node in &nodes {
            *node.inner.tracker.lock() = None;
        }
        tracker.unregister(&nodes);
    }

    /// Drop every subscriber of this node, breaking handler cycles.
    pub(crate) fn clear_signals(&self) {
        let signals: Vec<Arc<Signal>> =
            self.inner.signals.lock().drain().map(|(_, s)| s).collect();
        for signal in signals {
            signal.clear();
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", self.id())
            .field("kind", &self.kind())
            .finish()
    }
}
