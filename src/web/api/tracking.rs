use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::position::VehicleId;
use crate::status::StatusSnapshot;
use crate::sync::FlushOutcome;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartRequest {
    pub vehicle_id: VehicleId,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StopResponse {
    pub status: StatusSnapshot,
    /// Result of the final flush; absent when nothing was being tracked.
    pub flush: Option<FlushOutcome>,
}

#[utoipa::path(
    post,
    path = "/api/tracking/start",
    request_body = StartRequest,
    responses(
        (status = 200, description = "Tracking started", body = StatusSnapshot),
        (status = 400, description = "Invalid vehicle id", body = ErrorResponse),
        (status = 503, description = "Foreground capture unavailable", body = ErrorResponse)
    ),
    tag = "tracking"
)]
pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> ApiResult<Json<StatusSnapshot>> {
    let mut controller = state.controller.lock().await;
    controller.start_tracking(request.vehicle_id).await?;
    Ok(Json(state.reporter.snapshot()))
}

#[utoipa::path(
    post,
    path = "/api/tracking/stop",
    responses(
        (status = 200, description = "Tracking stopped", body = StopResponse)
    ),
    tag = "tracking"
)]
pub async fn stop(State(state): State<AppState>) -> Json<StopResponse> {
    let mut controller = state.controller.lock().await;
    let flush = controller.stop_tracking().await;
    Json(StopResponse {
        status: state.reporter.snapshot(),
        flush,
    })
}
