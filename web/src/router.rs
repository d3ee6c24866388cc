use crate::controller::{
    connection_controller, dispatch_controller, health_check_controller, metrics_controller,
};
use crate::middleware::cors::setup_cors;
use crate::{params, sse::handler, AppState};
use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use utoipa::OpenApi;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Push Relay API"
        ),
        paths(
            connection_controller::index,
            dispatch_controller::send_to_user,
            health_check_controller::health_check,
            metrics_controller::system_metrics,
            handler::sse_handler,
        ),
        components(
            schemas(
                connection_controller::ConnectionsResponse,
                metrics_controller::SystemMetrics,
                params::dispatch::DispatchParams,
                params::dispatch::DispatchResponse,
            )
        ),
        tags(
            (name = "push_relay", description = "Per-user push messaging over Server-Sent Events")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    let cors = setup_cors(&app_state.config);

    Router::new()
        .merge(health_routes())
        .merge(connection_routes(app_state.clone()))
        .merge(metrics_routes(app_state.clone()))
        .merge(sse_routes(app_state.clone()))
        .merge(dispatch_routes(app_state))
        .merge(openapi_routes())
        .layer(cors)
        .layer(CatchPanicLayer::new())
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn connection_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/connections", get(connection_controller::index))
        .with_state(app_state)
}

fn metrics_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/metrics/system", get(metrics_controller::system_metrics))
        .with_state(app_state)
}

fn sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse", get(handler::sse_handler))
        .with_state(app_state)
}

fn dispatch_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/send-to-user", post(dispatch_controller::send_to_user))
        .with_state(app_state)
}

fn openapi_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
