//! HTTP surface of the push relay.
//!
//! Routes, request parameters, error translation, the counting transport listener
//! and the shutdown coordinator that drains every stream before the process exits.

use crate::listener::CountingListener;
use crate::shutdown::{shutdown_signal, ShutdownCoordinator};
use log::*;

pub use service::AppState;

mod controller;
pub mod error;
pub mod listener;
mod middleware;
mod params;
pub mod router;
mod sse;
pub mod shutdown;

/// Bind the configured address and serve until a termination signal has been
/// handled. Returns an error if binding fails or shutdown exceeds its grace period.
pub async fn init_server(app_state: AppState) -> error::Result<()> {
    let address = app_state.config.bind_address();
    let listener = CountingListener::bind(address.as_str(), app_state.connections.clone()).await?;
    info!("Server starting... listening for connections on http://{address}");

    let mut coordinator =
        ShutdownCoordinator::new(&app_state.sse_manager, app_state.config.shutdown_grace());
    let router = router::define_routes(app_state);

    coordinator.run(listener, router, shutdown_signal()).await?;

    info!("Server shutdown complete.");
    Ok(())
}
