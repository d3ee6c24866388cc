use crate::error::{Error, InputErrorKind};
use crate::params::dispatch::{DispatchParams, DispatchResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use log::*;
use service::AppState;

/// POST push a value to every stream open for a user
///
/// Delivery is best effort: a stream whose queue is full does not receive the
/// value, and `sent` only counts the streams that accepted it.
#[utoipa::path(
    post,
    path = "/send-to-user",
    request_body = DispatchParams,
    responses(
        (status = 200, description = "Number of streams that accepted the value", body = DispatchResponse),
        (status = 400, description = "Missing userID or malformed body"),
    )
)]
pub async fn send_to_user(
    State(app_state): State<AppState>,
    body: Result<Json<DispatchParams>, JsonRejection>,
) -> Result<impl IntoResponse, Error> {
    let Json(params) = body.inspect_err(|e| debug!("Rejected dispatch body: {e}"))?;

    let user_id = params
        .user_id()
        .ok_or_else(|| Error::input(InputErrorKind::MissingUserId))?
        .to_string();

    let delivery = app_state.sse_manager.dispatch(&user_id, params.value);

    Ok(Json(DispatchResponse {
        sent: delivery.sent,
    }))
}
