use crate::error::{Error, Result, WebErrorKind};
use axum::serve::Listener;
use axum::Router;
use log::*;
use sse::Manager;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Phases of a server's life, from serving requests to process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    /// Every session has been closed and the listener is draining.
    ShuttingDown,
    /// All connections finished within the grace period.
    Drained,
    /// The grace period elapsed with connections still open.
    TimedOut,
    Terminated,
}

/// Serves the router until a termination signal arrives, then closes every
/// session and drains open connections within a bounded grace period.
pub struct ShutdownCoordinator {
    sse_manager: Arc<Manager>,
    grace: Duration,
    state: ShutdownState,
}

impl ShutdownCoordinator {
    pub fn new(sse_manager: &Arc<Manager>, grace: Duration) -> Self {
        Self {
            sse_manager: Arc::clone(sse_manager),
            grace,
            state: ShutdownState::Running,
        }
    }

    pub fn state(&self) -> ShutdownState {
        self.state
    }

    fn transition(&mut self, next: ShutdownState) {
        debug!("Shutdown state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Serve `router` on `listener` until `signal` resolves.
    ///
    /// Closing every session first makes each stream finish its response, so the
    /// graceful drain is not held open by streams waiting for values. Exceeding the
    /// grace period aborts the server and returns a `ShutdownTimeout` error.
    pub async fn run<L, F>(&mut self, listener: L, router: Router, signal: F) -> Result<()>
    where
        L: Listener,
        L::Addr: Debug,
        F: Future<Output = ()> + Send,
    {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            // A dropped sender also starts the drain
            let _ = stop_rx.await;
        });
        let mut server = tokio::spawn(async move { server.await });

        tokio::select! {
            _ = signal => {},
            joined = &mut server => {
                // The server stopped on its own, before any termination signal
                self.transition(ShutdownState::Terminated);
                joined??;
                return Ok(());
            }
        }

        info!("Gracefully shutting down the server...");
        self.transition(ShutdownState::ShuttingDown);
        self.sse_manager.close_all();
        let _ = stop_tx.send(());

        match tokio::time::timeout(self.grace, &mut server).await {
            Ok(joined) => {
                self.transition(ShutdownState::Drained);
                self.transition(ShutdownState::Terminated);
                joined??;
                Ok(())
            }
            Err(_) => {
                server.abort();
                self.transition(ShutdownState::TimedOut);
                error!(
                    "Connections still open after the {}s shutdown grace period",
                    self.grace.as_secs_f32()
                );
                self.transition(ShutdownState::Terminated);
                Err(Error::new(WebErrorKind::ShutdownTimeout))
            }
        }
    }
}

/// Resolves when the process receives SIGINT (Ctrl+C) or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received terminate signal"),
    }
}
