//! The browser renderer, compiled into the binary.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::server::router::ServerState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");
const RENDERER_JS: &str = include_str!("../../assets/renderer.js");

pub(crate) async fn index(State(state): State<ServerState>) -> Html<String> {
    Html(render_index(state.app.title(), &state.config.server.ws_path))
}

pub(crate) async fn asset(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "renderer.js" => (
            [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
            RENDERER_JS,
        )
            .into_response(),
        _ => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

fn render_index(title: &str, ws_path: &str) -> String {
    INDEX_HTML
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{WS_PATH}}", &escape_html(ws_path))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
