//! The mutable UI node tree.
//!
//! Nodes carry identity, hierarchy, a JSON property map and per-event
//! signals. A subtree bound to a session reports every change through the
//! session's [`Tracker`]; an unbound subtree is just data.

mod node;
mod signal;
mod snapshot;
mod widgets;

pub use node::{Node, NodeId, NodeKind, TreeError};
pub use signal::{Event, HandlerFuture, Signal, SignalError, SubscriptionId};
pub use snapshot::NodeSnapshot;
pub use widgets::{NAVIGATION_FROM, NAVIGATION_TO};

use crate::protocol::ChangeRecord;

/// Observer of a bound subtree. Implemented by the session core.
pub(crate) trait Tracker: Send + Sync {
    /// A change happened somewhere in the bound tree.
    fn record(&self, record: ChangeRecord);
    /// Nodes joined the bound tree.
    fn register(&self, nodes: &[Node]);
    /// Nodes left the bound tree.
    fn unregister(&self, nodes: &[Node]);
}
