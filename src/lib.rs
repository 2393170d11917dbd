//! Server-driven UI: a widget tree lives on the server, a thin browser
//! renderer mirrors it over a WebSocket and sends user events back.

pub mod app;
pub mod config;
pub mod demo;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tree;

pub use app::App;
pub use session::{Navigator, Session, SessionError};
pub use tree::{Event, Node, NodeId, NodeKind};
