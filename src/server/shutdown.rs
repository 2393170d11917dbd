use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;

pub struct ShutdownManager {
    shutdown: AtomicBool,
    active_sessions: Arc<AtomicUsize>,
    notify: Notify,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            active_sessions: Arc::new(AtomicUsize::new(0)),
            notify: Notify::new(),
        }
    }

    /// Resolve on Ctrl-C, SIGTERM, or an explicit [`signal_shutdown`](Self::signal_shutdown).
    pub async fn wait_for_shutdown(&self) -> std::io::Result<()> {
        if self.is_shutting_down() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                _ = signal::ctrl_c() => {},
                _ = sigterm.recv() => {},
                _ = self.cancelled() => {},
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = signal::ctrl_c() => {},
                _ = self.cancelled() => {},
            }
        }

        self.signal_shutdown();
        tracing::info!("Shutting down gracefully...");
        Ok(())
    }

    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been signalled, including before this call.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_shutting_down() {
            return;
        }
        notified.await;
    }

    /// Count a live WebSocket session until the guard is dropped.
    pub fn session_guard(&self) -> SessionGuard {
        self.active_sessions.fetch_add(1, Ordering::SeqCst);
        SessionGuard {
            active_sessions: self.active_sessions.clone(),
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::SeqCst)
    }

    pub async fn wait_for_sessions(&self, timeout: Duration) {
        tracing::info!(active = self.active_sessions(), "Waiting for active sessions...");

        let start = tokio::time::Instant::now();

        while start.elapsed() < timeout {
            if self.active_sessions() == 0 {
                tracing::info!("Server stopped");
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tracing::warn!(
            remaining = self.active_sessions(),
            "Forced shutdown after timeout"
        );
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SessionGuard {
    active_sessions: Arc<AtomicUsize>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_track_active_sessions() {
        let shutdown = ShutdownManager::new();
        let first = shutdown.session_guard();
        let second = shutdown.session_guard();
        assert_eq!(shutdown.active_sessions(), 2);

        drop(first);
        assert_eq!(shutdown.active_sessions(), 1);
        drop(second);
        assert_eq!(shutdown.active_sessions(), 0);
    }

    #[tokio::test]
    async fn cancelled_resolves_after_signal() {
        let shutdown = Arc::new(ShutdownManager::new());
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.cancelled().await })
        };
        tokio::task::yield_now().await;

        shutdown.signal_shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();

        // Already signalled: returns immediately.
        shutdown.cancelled().await;
        assert!(shutdown.is_shutting_down());
    }

    #[tokio::test]
    async fn wait_for_sessions_returns_when_drained() {
        let shutdown = ShutdownManager::new();
        let guard = shutdown.session_guard();
        drop(guard);
        tokio::time::timeout(
            Duration::from_secs(1),
            shutdown.wait_for_sessions(Duration::from_secs(5)),
        )
        .await
        .unwrap();
    }
}
