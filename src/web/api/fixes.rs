use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::capture::CaptureMode;
use crate::position::RawFix;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[utoipa::path(
    post,
    path = "/api/fixes/{mode}",
    params(
        ("mode" = CaptureMode, Path, description = "Subscription the fix belongs to")
    ),
    request_body = RawFix,
    responses(
        (status = 202, description = "Fix handed to the tracker"),
        (status = 409, description = "No live subscription for this mode", body = ErrorResponse),
        (status = 503, description = "Tracker not keeping up", body = ErrorResponse)
    ),
    tag = "capture"
)]
pub async fn publish(
    State(state): State<AppState>,
    Path(mode): Path<CaptureMode>,
    Json(fix): Json<RawFix>,
) -> ApiResult<StatusCode> {
    state.feed.publish(mode, fix)?;
    Ok(StatusCode::ACCEPTED)
}
