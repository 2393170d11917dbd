//! One WebSocket connection driving one session.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};

use crate::server::router::ServerState;
use crate::session::{ChannelTransport, Session, SessionError};

const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) async fn handle_socket(socket: WebSocket, state: ServerState) {
    let _guard = state.shutdown.session_guard();
    let session = Session::new();
    // Flushes run on this task, interleaved with dispatch at its awaits.
    let flushes = session.flush_loop();

    if let Err(err) = state.app.build(&session) {
        tracing::error!(session = %session.label(), error_type = err.error_type(), error = %err, "failed to build application");
        session.close();
        return;
    }
    match session.navigator().initialize().await {
        Ok(()) => {}
        Err(SessionError::NoDefaultPage) => {
            tracing::debug!(session = %session.label(), "application registered no pages");
        }
        Err(err) => {
            tracing::error!(session = %session.label(), error_type = err.error_type(), error = %err, "failed to initialize navigation");
        }
    }

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (transport, mut outbound) = ChannelTransport::new(state.config.session.outbound_buffer);

    let mut writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let transport_id = match session.connect(Arc::new(transport)).await {
        Ok(id) => id,
        Err(err) => {
            tracing::error!(session = %session.label(), error_type = err.error_type(), error = %err, "failed to send initial state");
            session.close();
            writer.abort();
            return;
        }
    };

    let inbound = async {
        loop {
            tokio::select! {
                message = ws_rx.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(err) = session.dispatch_inbound(text.as_str()).await {
                            report(&session, &err);
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::warn!(session = %session.label(), bytes = data.len(), "binary frames are not supported; dropped");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Err(err)) => {
                        tracing::debug!(session = %session.label(), error = %err, "websocket receive failed");
                        break;
                    }
                },
                _ = state.shutdown.cancelled() => {
                    tracing::debug!(session = %session.label(), "closing for shutdown");
                    break;
                }
            }
        }
    };
    tokio::select! {
        _ = flushes => {}
        _ = inbound => {}
    }

    session.disconnect(transport_id);
    session.close();
    tracing::info!(session = %session.label(), "client disconnected");
    drop(session);

    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        tracing::debug!("socket writer did not finish in time");
        writer.abort();
    }
}

/// Errors raised while handling one message never end the connection.
fn report(session: &Session, err: &SessionError) {
    if err.is_protocol() {
        tracing::warn!(session = %session.label(), error_type = err.error_type(), error = %err, "rejected client message");
    } else {
        tracing::error!(session = %session.label(), error_type = err.error_type(), error = %err, "error handling client message");
    }
}
