//! Per-connection application factory.

use crate::session::{Session, SessionError};

/// Builds the pages of a freshly created session.
///
/// The server calls [`App::build`] once per connection, then initializes
/// navigation and sends the initial state.
pub trait App: Send + Sync + 'static {
    /// Document title used by the index page.
    fn title(&self) -> &str {
        "livetree"
    }

    fn build(&self, session: &Session) -> Result<(), SessionError>;
}

impl<F> App for F
where
    F: Fn(&Session) -> Result<(), SessionError> + Send + Sync + 'static,
{
    fn build(&self, session: &Session) -> Result<(), SessionError> {
        self(session)
    }
}
