//! The three-page application served by the `livetree` binary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app::App;
use crate::session::{Session, SessionError};
use crate::tree::Node;

pub struct DemoApp;

impl App for DemoApp {
    fn title(&self) -> &str {
        "livetree demo"
    }

    fn build(&self, session: &Session) -> Result<(), SessionError> {
        let navigator = session.navigator();
        navigator.register("home", "Home", build_home)?;
        navigator.register("about", "About", |page| build_about(page, session))?;
        navigator.register("contact", "Contact", build_contact)?;
        Ok(())
    }
}

fn build_home(page: &Node) -> Result<(), SessionError> {
    page.attach(&Node::label("Welcome to livetree"))?;
    page.attach(&Node::label("Every widget below lives on the server."))?;

    let links = Node::container();
    links.attach(&Node::nav_link("About", "about"))?;
    links.attach(&Node::nav_link("Contact", "contact"))?;
    page.attach(&links)?;

    let counter = Arc::new(AtomicU64::new(0));
    let counter_label = Node::label("Count: 0");
    let counter_button = Node::button("Increment");
    {
        let counter_label = counter_label.clone();
        counter_button.on_click(move |_| {
            let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
            counter_label.set_text(&format!("Count: {count}"));
            async { Ok(()) }
        });
    }
    page.attach(&counter_label)?;
    page.attach(&counter_button)?;

    let name = Node::text_input("", "Your name");
    let greeting = Node::label("");
    {
        let greeting = greeting.clone();
        name.on_change(move |event| {
            let name = event.sender.value();
            if name.is_empty() {
                greeting.set_text("");
            } else {
                greeting.set_text(&format!("Hello, {name}!"));
            }
            async { Ok(()) }
        });
    }
    page.attach(&name)?;
    page.attach(&greeting)?;

    let uptime = Node::label("Connected for 0s");
    page.attach(&uptime)?;
    if let Ok(runtime) = tokio::runtime::Handle::try_current() {
        runtime.spawn(tick(uptime));
    }
    Ok(())
}

/// Updates `label` once a second until its session goes away.
async fn tick(label: Node) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await;
    let mut seconds = 0u64;
    loop {
        interval.tick().await;
        if !label.is_bound() {
            break;
        }
        seconds += 1;
        label.set_text(&format!("Connected for {seconds}s"));
    }
    tracing::debug!(node = %label.id(), "uptime ticker stopped");
}

fn build_about(page: &Node, session: &Session) -> Result<(), SessionError> {
    page.attach(&Node::label("About livetree"))?;
    for line in [
        "Pages, widgets and handlers run on the server.",
        "The browser only mirrors the tree and forwards events.",
        "Changes made in one handler reach the browser as one batch.",
    ] {
        page.attach(&Node::label(line))?;
    }

    let back = Node::button("Back");
    {
        let session = session.clone();
        back.on_click(move |_| {
            let session = session.clone();
            async move {
                session.navigator().navigate_back().await?;
                Ok(())
            }
        });
    }
    page.attach(&back)?;
    page.attach(&Node::nav_link("Home", "home"))?;
    page.attach(&Node::nav_link("Contact", "contact"))?;
    Ok(())
}

fn build_contact(page: &Node) -> Result<(), SessionError> {
    page.attach(&Node::label("Get in touch"))?;

    let form = Node::container();
    let name = Node::text_input("", "Your name");
    let email = Node::text_input("", "you@example.com");
    let message = Node::text_input("", "Your message");
    let result = Node::label("");
    let submit = Node::button("Send");
    for (caption, input) in [("Name:", &name), ("Email:", &email), ("Message:", &message)] {
        form.attach(&Node::label(caption))?;
        form.attach(input)?;
    }
    {
        let result = result.clone();
        submit.on_click(move |_| {
            result.set_text(&submit_message(&name.value(), &email.value(), &message.value()));
            async { Ok(()) }
        });
    }
    form.attach(&submit)?;
    form.attach(&result)?;
    page.attach(&form)?;

    page.attach(&Node::nav_link("Home", "home"))?;
    page.attach(&Node::nav_link("About", "about"))?;
    Ok(())
}

fn submit_message(name: &str, email: &str, message: &str) -> String {
    if name.is_empty() || email.is_empty() || message.is_empty() {
        return "Please fill in every field.".to_string();
    }
    format!("Thanks, {name}! We will reply to {email}.")
}
