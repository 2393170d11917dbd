use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::router::ServerState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub active_sessions: usize,
}

pub(crate) async fn health(State(state): State<ServerState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        service: "livetree".to_string(),
        active_sessions: state.shutdown.active_sessions(),
    })
}
