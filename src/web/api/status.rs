use axum::{extract::State, Json};

use crate::position::PositionSample;
use crate::status::StatusSnapshot;
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Current agent status", body = StatusSnapshot)
    ),
    tag = "status"
)]
pub async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.reporter.snapshot())
}

#[utoipa::path(
    get,
    path = "/api/status/last-position",
    responses(
        (status = 200, description = "Last accepted position", body = Option<PositionSample>)
    ),
    tag = "status"
)]
pub async fn last_position(State(state): State<AppState>) -> Json<Option<PositionSample>> {
    Json(state.reporter.last_position())
}
