//! Page visibility state machine.
//!
//! Pages are subtrees under the root; exactly one is visible once
//! navigation has started. Every transition records a `navigation` entry
//! followed by a `page_widgets` snapshot of the page being shown.

use parking_lot::Mutex;
use serde_json::Map;

use crate::protocol::ChangeRecord;
use crate::session::error::SessionError;
use crate::tree::{Node, NAVIGATION_FROM, NAVIGATION_TO};

#[derive(Default)]
struct NavState {
    /// Registration order.
    pages: Vec<(String, Node)>,
    current: Option<String>,
    default: Option<String>,
    history: Vec<String>,
}

impl NavState {
    fn page(&self, path: &str) -> Option<Node> {
        self.pages
            .iter()
            .find(|(registered, _)| registered == path)
            .map(|(_, page)| page.clone())
    }
}

pub struct Navigator {
    root: Node,
    state: Mutex<NavState>,
}

impl Navigator {
    pub(crate) fn new(root: Node) -> Self {
        Self {
            root,
            state: Mutex::new(NavState::default()),
        }
    }

    /// Build a page under `path` and attach it, hidden, to the root.
    ///
    /// `build` populates the freshly created page before it joins the
    /// tree. The first registered path becomes the default.
    pub fn register<F>(&self, path: &str, title: &str, build: F) -> Result<Node, SessionError>
    where
        F: FnOnce(&Node) -> Result<(), SessionError>,
    {
        if self.state.lock().page(path).is_some() {
            return Err(SessionError::DuplicatePath {
                path: path.to_string(),
            });
        }

        let page = Node::page(path, title);
        build(&page)?;
        self.root.attach(&page)?;
        page.set_property("visible", false);

        let mut state = self.state.lock();
        state.pages.push((path.to_string(), page.clone()));
        if state.default.is_none() {
            state.default = Some(path.to_string());
        }
        tracing::debug!(path, title, "registered page");
        Ok(page)
    }

    pub fn set_default(&self, path: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock();
        if state.page(path).is_none() {
            return Err(SessionError::UnknownPath {
                path: path.to_string(),
            });
        }
        state.default = Some(path.to_string());
        Ok(())
    }

    pub fn default_path(&self) -> Option<String> {
        self.state.lock().default.clone()
    }

    pub fn current_path(&self) -> Option<String> {
        self.state.lock().current.clone()
    }

    pub fn current_page(&self) -> Option<Node> {
        let state = self.state.lock();
        state.current.as_deref().and_then(|path| state.page(path))
    }

    pub fn history(&self) -> Vec<String> {
        self.state.lock().history.clone()
    }

    /// Registered paths in registration order.
    pub fn paths(&self) -> Vec<String> {
        self.state
            .lock()
            .pages
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn page(&self, path: &str) -> Option<Node> {
        self.state.lock().page(path)
    }

    /// Navigate to the default page.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        let Some(path) = self.default_path() else {
            return Err(SessionError::NoDefaultPage);
        };
        self.navigate_to(&path).await
    }

    pub async fn navigate_to(&self, path: &str) -> Result<(), SessionError> {
        self.transition(path, true).await
    }

    /// Return to the page visited before the current one. Does nothing when
    /// there is no history.
    pub async fn navigate_back(&self) -> Result<(), SessionError> {
        let previous = self.state.lock().history.pop();
        match previous {
            Some(path) => self.transition(&path, false).await,
            None => Ok(()),
        }
    }

    async fn transition(&self, path: &str, push_history: bool) -> Result<(), SessionError> {
        let (target, previous, pages) = {
            let state = self.state.lock();
            let Some(target) = state.page(path) else {
                return Err(SessionError::UnknownPath {
                    path: path.to_string(),
                });
            };
            let previous = state
                .current
                .clone()
                .and_then(|current| state.page(&current).map(|page| (current, page)));
            let pages: Vec<Node> = state.pages.iter().map(|(_, page)| page.clone()).collect();
            (target, previous, pages)
        };

        if let Some((_, page)) = &previous {
            run_hook(page, NAVIGATION_FROM).await;
        }

        for page in &pages {
            page.set_property("visible", false);
        }
        target.set_property("visible", true);

        {
            let mut state = self.state.lock();
            state.current = Some(path.to_string());
            if let Some((previous_path, _)) = previous {
                if push_history {
                    state.history.push(previous_path);
                }
            }
        }

        run_hook(&target, NAVIGATION_TO).await;

        let title = target.get_str("title");
        tracing::info!(path, title = %title, "navigated");
        if let Some(tracker) = self.root.tracker() {
            // Snapshot first so the two records are enqueued back to back.
            let widgets = target.subtree_snapshots();
            tracker.record(ChangeRecord::Navigation {
                path: path.to_string(),
                title,
            });
            tracker.record(ChangeRecord::PageWidgets {
                page_path: path.to_string(),
                widgets,
            });
        }
        Ok(())
    }
}

/// Lifecycle hooks observe navigation; a failing hook is logged and the
/// transition continues.
async fn run_hook(page: &Node, hook: &str) {
    if let Err(err) = page.dispatch(hook, Map::new()).await {
        tracing::error!(page = %page.id(), hook, error = %err, "navigation hook failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn navigator_with(paths: &[&str]) -> Navigator {
        let navigator = Navigator::new(Node::root());
        for path in paths {
            navigator
                .register(path, &path.to_uppercase(), |page| {
                    page.attach(&Node::label(path))?;
                    Ok(())
                })
                .unwrap();
        }
        navigator
    }

    fn visible(navigator: &Navigator) -> Vec<String> {
        navigator
            .paths()
            .into_iter()
            .filter(|path| navigator.page(path).is_some_and(|page| page.is_visible()))
            .collect()
    }

    #[test]
    fn first_registration_becomes_default() {
        let navigator = navigator_with(&["home", "about"]);
        assert_eq!(navigator.default_path().as_deref(), Some("home"));
        assert_eq!(navigator.paths(), vec!["home", "about"]);
        assert!(visible(&navigator).is_empty());
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let navigator = navigator_with(&["home"]);
        let err = navigator.register("home", "Again", |_| Ok(())).unwrap_err();
        assert!(matches!(err, SessionError::DuplicatePath { .. }));
        assert_eq!(navigator.paths().len(), 1);
    }

    #[test]
    fn set_default_requires_known_path() {
        let navigator = navigator_with(&["home", "about"]);
        navigator.set_default("about").unwrap();
        assert_eq!(navigator.default_path().as_deref(), Some("about"));
        assert!(matches!(
            navigator.set_default("missing"),
            Err(SessionError::UnknownPath { .. })
        ));
    }

    #[tokio::test]
    async fn exactly_one_page_visible_after_navigation() {
        let navigator = navigator_with(&["home", "about", "contact"]);
        for path in ["about", "contact", "home", "home"] {
            navigator.navigate_to(path).await.unwrap();
            assert_eq!(visible(&navigator), vec![path.to_string()]);
            assert_eq!(navigator.current_path().as_deref(), Some(path));
        }
    }

    #[tokio::test]
    async fn unknown_path_changes_nothing() {
        let navigator = navigator_with(&["home", "about"]);
        navigator.navigate_to("home").await.unwrap();

        let err = navigator.navigate_to("nowhere").await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownPath { path } if path == "nowhere"));
        assert_eq!(visible(&navigator), vec!["home".to_string()]);
        assert!(navigator.history().is_empty());
    }

    #[tokio::test]
    async fn back_restores_previous_page() {
        let navigator = navigator_with(&["a", "b"]);
        navigator.navigate_to("a").await.unwrap();
        navigator.navigate_to("b").await.unwrap();
        assert_eq!(navigator.history(), vec!["a"]);

        navigator.navigate_back().await.unwrap();
        assert_eq!(visible(&navigator), vec!["a".to_string()]);
        let current = navigator.current_page().unwrap();
        assert!(current.ptr_eq(&navigator.page("a").unwrap()));
        assert!(navigator.history().is_empty());

        navigator.navigate_back().await.unwrap();
        assert_eq!(navigator.current_path().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn initialize_without_pages_is_an_error() {
        let navigator = Navigator::new(Node::root());
        assert!(matches!(
            navigator.initialize().await,
            Err(SessionError::NoDefaultPage)
        ));
    }

    #[tokio::test]
    async fn hooks_run_around_visibility_change() {
        let navigator = navigator_with(&["home", "about"]);
        let home = navigator.page("home").unwrap();
        let about = navigator.page("about").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        {
            let log = log.clone();
            home.on_navigation_from(move |event| {
                let log = log.clone();
                async move {
                    log.lock().push(format!("from home visible={}", event.sender.is_visible()));
                    Ok(())
                }
            });
        }
        {
            let log = log.clone();
            about.on_navigation_to(move |event| {
                let log = log.clone();
                async move {
                    log.lock().push(format!("to about visible={}", event.sender.is_visible()));
                    Ok(())
                }
            });
        }

        navigator.navigate_to("home").await.unwrap();
        navigator.navigate_to("about").await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["from home visible=true", "to about visible=true"]
        );
    }

    #[tokio::test]
    async fn failing_hook_does_not_block_navigation() {
        let navigator = navigator_with(&["home", "about"]);
        navigator
            .page("about")
            .unwrap()
            .on_navigation_to(|_| async { Err::<(), _>(anyhow::anyhow!("hook failed")) });

        navigator.navigate_to("about").await.unwrap();
        assert_eq!(visible(&navigator), vec!["about".to_string()]);
    }
}
