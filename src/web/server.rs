use axum::{routing::get, routing::post, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::position::VehicleId;
use crate::scheduler::spawn_periodic_flush;

use super::api::fixes as fix_handlers;
use super::api::status as status_handlers;
use super::api::sync as sync_handlers;
use super::api::tracking as tracking_handlers;
use super::api_doc::ApiDoc;
use super::state::{AgentError, AppState};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Tracking lifecycle
        .route("/api/tracking/start", post(tracking_handlers::start))
        .route("/api/tracking/stop", post(tracking_handlers::stop))
        // Sync
        .route("/api/sync/flush", post(sync_handlers::flush))
        // Status
        .route("/api/status", get(status_handlers::status))
        .route(
            "/api/status/last-position",
            get(status_handlers::last_position),
        )
        // Capture ingestion
        .route("/api/fixes/{mode}", post(fix_handlers::publish))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config, vehicle: Option<VehicleId>) -> Result<(), AgentError> {
    let bind_addr = config.web.bind.clone();
    let state = AppState::from_config(&config)?;

    let scheduler = config
        .sync
        .interval
        .map(|interval| spawn_periodic_flush(state.sync.clone(), interval));

    if let Some(vehicle) = vehicle {
        let mut controller = state.controller.lock().await;
        if let Err(e) = controller.start_tracking(vehicle).await {
            log::error!("Could not start tracking at launch: {}", e);
        }
    }

    let app = router(state.clone());

    log::info!("Starting control API on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.cancel();
    }

    log::info!("Shutting down, stopping tracking");
    state.controller.lock().await.stop_tracking().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
