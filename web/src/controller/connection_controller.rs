use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use service::AppState;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ConnectionsResponse {
    /// Transport connections currently open on the listener.
    #[serde(rename = "open-connections")]
    pub open_connections: usize,
    /// Registered stream sessions.
    pub sessions: usize,
    /// Deliveries dropped because a stream's queue was full or closing.
    #[serde(rename = "dropped-messages")]
    pub dropped_messages: u64,
}

/// GET report open connection and session counts
#[utoipa::path(
    get,
    path = "/connections",
    responses(
        (status = 200, description = "Current connection and session counts", body = ConnectionsResponse),
    )
)]
pub async fn index(State(app_state): State<AppState>) -> impl IntoResponse {
    Json(ConnectionsResponse {
        open_connections: app_state.connections.current(),
        sessions: app_state.sse_manager.session_count(),
        dropped_messages: app_state.sse_manager.dropped_total(),
    })
}
