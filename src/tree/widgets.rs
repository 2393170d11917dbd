//! Constructors and accessors for the concrete widget kinds.
//!
//! Widgets are plain nodes; these helpers only pick the initial property set
//! for each kind and give typed access to the common properties.

use std::future::Future;

use serde_json::{Map, Value};

use super::node::{Node, NodeKind};
use super::signal::{Event, SubscriptionId};

/// Page lifecycle signal fired on the page being left, before visibility changes.
pub const NAVIGATION_FROM: &str = "navigation_from";
/// Page lifecycle signal fired on the page being shown, after visibility changes.
pub const NAVIGATION_TO: &str = "navigation_to";

fn props<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

impl Node {
    pub(crate) fn root() -> Self {
        Self::with_properties(NodeKind::RootContainer, Map::new())
    }

    pub fn container() -> Self {
        Self::with_properties(NodeKind::Container, Map::new())
    }

    pub fn page(path: &str, title: &str) -> Self {
        Self::with_properties(
            NodeKind::Page,
            props([("title", title.into()), ("path", path.into())]),
        )
    }

    pub fn label(text: &str) -> Self {
        Self::with_properties(NodeKind::Label, props([("text", text.into())]))
    }

    pub fn button(text: &str) -> Self {
        Self::with_properties(NodeKind::Button, props([("text", text.into())]))
    }

    pub fn text_input(value: &str, placeholder: &str) -> Self {
        Self::with_properties(
            NodeKind::TextInput,
            props([("value", value.into()), ("placeholder", placeholder.into())]),
        )
    }

    pub fn nav_link(text: &str, path: &str) -> Self {
        Self::with_properties(
            NodeKind::NavLink,
            props([("text", text.into()), ("path", path.into())]),
        )
    }

    pub fn text(&self) -> String {
        self.get_str("text")
    }

    pub fn set_text(&self, text: &str) {
        self.set_property("text", text);
    }

    pub fn value(&self) -> String {
        self.get_str("value")
    }

    pub fn set_value(&self, value: &str) {
        self.set_property("value", value);
    }

    pub fn placeholder(&self) -> String {
        self.get_str("placeholder")
    }

    pub fn set_placeholder(&self, placeholder: &str) {
        self.set_property("placeholder", placeholder);
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.get_property("visible"), Some(Value::Bool(true)))
    }

    pub fn on_click<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on("click", handler)
    }

    pub fn on_change<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on("change", handler)
    }

    pub fn on_navigation_to<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on(NAVIGATION_TO, handler)
    }

    pub fn on_navigation_from<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on(NAVIGATION_FROM, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_start_with_their_properties() {
        let input = Node::text_input("hi", "type here");
        assert_eq!(input.kind(), NodeKind::TextInput);
        assert_eq!(input.value(), "hi");
        assert_eq!(input.placeholder(), "type here");

        let link = Node::nav_link("About", "about");
        assert_eq!(link.text(), "About");
        assert_eq!(link.get_property("path"), Some(json!("about")));

        let page = Node::page("home", "Home");
        assert_eq!(page.get_property("title"), Some(json!("Home")));
        assert!(!page.is_visible());

        assert!(Node::container().snapshot().properties.is_empty());
    }

    #[test]
    fn setters_write_properties() {
        let button = Node::button("old");
        button.set_text("new");
        assert_eq!(button.text(), "new");

        let input = Node::text_input("", "");
        input.set_value("v");
        input.set_placeholder("p");
        assert_eq!(input.value(), "v");
        assert_eq!(input.placeholder(), "p");
    }
}
