use log::{error, info};
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
    }

    info!(
        "Starting push relay on {} (queue capacity {}, keep-alive {}s)",
        config.bind_address(),
        config.sse_queue_capacity,
        config.sse_keep_alive_secs
    );

    let sse_manager = Arc::new(sse::Manager::new(config.sse_queue_capacity));
    let app_state = AppState::new(config, &sse_manager);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped with an error: {e}");
        std::process::exit(1);
    }
}
