//! HTTP front door: index page, renderer assets, health check and the
//! WebSocket endpoint that hosts one session per connection.

mod assets;
mod error;
mod health;
mod router;
mod shutdown;
mod socket;

pub use error::ServerError;
pub use health::HealthStatus;
pub use shutdown::{SessionGuard, ShutdownManager};

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::app::App;
use crate::config::Config;
use crate::server::router::{build_router, ServerState};

/// How many ports above the configured one `try_bind` tries.
const PORT_FALLBACK_RANGE: u16 = 100;

pub struct AppServer {
    pub addr: SocketAddr,
    /// The bound listener, kept alive to prevent port race conditions.
    /// Populated by try_bind(), consumed by run().
    listener: Option<TcpListener>,
    state: ServerState,
}

impl AppServer {
    pub fn new(config: Config, app: Arc<dyn App>) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)), // Determined at bind time
            listener: None,
            state: ServerState {
                app,
                config: Arc::new(config),
                shutdown: Arc::new(ShutdownManager::new()),
            },
        }
    }

    /// Try to bind to the configured address, falling back to incremental
    /// ports if busy. Port 0 binds an ephemeral port directly.
    ///
    /// The listener is kept alive so no other process can claim the port
    /// between try_bind() and run().
    pub async fn try_bind(&mut self) -> Result<SocketAddr, ServerError> {
        let bind_addr = self.state.config.bind_addr()?;
        let start_port = bind_addr.port();
        let end_port = start_port.saturating_add(PORT_FALLBACK_RANGE);
        let host = bind_addr.ip();

        for port in start_port..=end_port {
            let try_addr = SocketAddr::new(host, port);
            match TcpListener::bind(try_addr).await {
                Ok(listener) => {
                    let actual_addr = listener.local_addr()?;
                    self.addr = actual_addr;
                    self.listener = Some(listener);
                    tracing::info!(addr = %actual_addr, "server bound");
                    return Ok(actual_addr);
                }
                Err(e) => {
                    tracing::debug!(port, error = %e, "port busy");
                }
            }
        }

        Err(ServerError::NoFreePort {
            start: start_port,
            end: end_port,
        })
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownManager> {
        self.state.shutdown.clone()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.state.shutdown.clone(),
        }
    }

    /// Serve until shutdown is signalled, then give open sessions the
    /// configured grace period to finish.
    ///
    /// Consumes self to take ownership of the pre-bound listener.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = self.listener.ok_or(ServerError::NotBound)?;

        tracing::info!(
            addr = %self.addr,
            ws_path = %self.state.config.server.ws_path,
            "Starting server"
        );

        let grace = Duration::from_secs(self.state.config.server.shutdown_grace_seconds);
        let shutdown = self.state.shutdown.clone();
        let app = build_router(self.state);

        let signal = shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(err) = signal.wait_for_shutdown().await {
                    tracing::error!(error = %err, "failed to install signal handlers");
                    signal.cancelled().await;
                }
            })
            .into_future()
            .await?;

        shutdown.wait_for_sessions(grace).await;
        tracing::info!("Shutting down gracefully");

        Ok(())
    }
}

#[derive(Clone)]
pub struct ServerHandle {
    shutdown: Arc<ShutdownManager>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        self.shutdown.signal_shutdown();
    }
}
