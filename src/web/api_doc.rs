use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::tracking::{StartRequest, StopResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::tracking::start,
        super::api::tracking::stop,
        super::api::sync::flush,
        super::api::status::status,
        super::api::status::last_position,
        super::api::fixes::publish,
    ),
    components(
        schemas(
            StartRequest,
            StopResponse,
            ErrorResponse,
            crate::status::StatusSnapshot,
            crate::tracker::TrackerState,
            crate::tracker::SessionStats,
            crate::sync::FlushOutcome,
            crate::position::PositionSample,
            crate::position::RawFix,
            crate::position::VehicleId,
            crate::capture::CaptureMode,
        )
    ),
    info(
        title = "Bus Beacon Control API",
        description = "Local control surface of the vehicle position agent",
        version = "0.1.0"
    ),
    tags(
        (name = "tracking", description = "Tracking lifecycle"),
        (name = "sync", description = "Pending queue delivery"),
        (name = "status", description = "Agent status"),
        (name = "capture", description = "Fix ingestion from the location provider")
    )
)]
pub struct ApiDoc;
