use config::Config;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub mod config;
pub mod logging;

/// Number of transport connections currently open on the listener.
#[derive(Clone, Debug, Default)]
pub struct ConnectionCounter(Arc<AtomicUsize>);

impl ConnectionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn closed(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn current(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

// Service-level state shared by every handler
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sse_manager: Arc<sse::Manager>,
    pub connections: ConnectionCounter,
}

impl AppState {
    pub fn new(app_config: Config, sse_manager: &Arc<sse::Manager>) -> Self {
        Self {
            config: app_config,
            sse_manager: Arc::clone(sse_manager),
            connections: ConnectionCounter::new(),
        }
    }
}
