use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::app::App;
use crate::config::Config;
use crate::server::shutdown::ShutdownManager;
use crate::server::{assets, health, socket};

#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) app: Arc<dyn App>,
    pub(crate) config: Arc<Config>,
    pub(crate) shutdown: Arc<ShutdownManager>,
}

pub(crate) fn build_router(state: ServerState) -> Router {
    let ws_path = state.config.server.ws_path.clone();
    Router::new()
        .route("/", get(assets::index))
        .route("/assets/{name}", get(assets::asset))
        .route("/health", get(health::health))
        .route(&ws_path, get(upgrade))
        .with_state(state)
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    ws.on_upgrade(move |stream| socket::handle_socket(stream, state))
}
