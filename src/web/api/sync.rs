use axum::{extract::State, Json};

use crate::sync::FlushOutcome;
use crate::web::state::AppState;

#[utoipa::path(
    post,
    path = "/api/sync/flush",
    responses(
        (status = 200, description = "Flush attempted", body = FlushOutcome)
    ),
    tag = "sync"
)]
pub async fn flush(State(state): State<AppState>) -> Json<FlushOutcome> {
    Json(state.sync.flush().await)
}
