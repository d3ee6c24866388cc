use crate::error::{Error, InputErrorKind};
use crate::params::stream::StreamParams;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::sse::Sse;
use axum::response::IntoResponse;
use log::*;
use service::AppState;
use sse::stream::event_stream;

/// GET open a long-lived event stream for a user
///
/// Registers a session for the user key and streams every value dispatched to that
/// key until the client disconnects or the server shuts down.
#[utoipa::path(
    get,
    path = "/sse",
    params(StreamParams),
    responses(
        (status = 200, description = "Event stream of current-value records", body = String, content_type = "text/event-stream"),
        (status = 400, description = "No userID was supplied"),
        (status = 503, description = "The server is shutting down")
    )
)]
pub async fn sse_handler(
    State(app_state): State<AppState>,
    params: Result<Query<StreamParams>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let user_id = params
        .ok()
        .and_then(|Query(params)| params.user_id())
        .ok_or_else(|| Error::input(InputErrorKind::MissingStreamUser))?;

    debug!("Establishing SSE connection for user {user_id}");

    // The subscription moves into the stream; dropping the stream unregisters it
    let subscription = app_state.sse_manager.open_session(user_id)?;
    let stream = event_stream(subscription, app_state.config.stream_options());

    Ok(([(header::CONNECTION, "keep-alive")], Sse::new(stream)))
}
