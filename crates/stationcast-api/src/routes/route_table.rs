//! Routes for inspecting and reloading the route table.

use axum::extract::State;
use axum::{
    Json, Router,
    routing::{get, post},
};
use stationcast_routes::{RouteLoadError, RouteReport, RouteTable};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /reload
///
/// Loads the CSV in the request body, or re-reads the configured route file
/// when the body is empty. The table is validated as a whole and replaces
/// the current one only if no event is running.
#[instrument(skip(state, body), fields(body_len = body.len()))]
async fn reload(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<RouteReport>, ApiError> {
    let total_stations = state.scheduler.config().total_stations;
    let source = if body.trim().is_empty() {
        tokio::fs::read_to_string(&state.routes_path)
            .await
            .map_err(|source| RouteLoadError::Io {
                path: state.routes_path.clone(),
                source,
            })?
    } else {
        body
    };
    let table = RouteTable::load(&source, total_stations, state.max_participants)?;
    let report = table.report();
    state.scheduler.reload_routes(table).await?;
    info!(
        participants = report.participants,
        fingerprint = %report.fingerprint,
        "route table replaced"
    );
    Ok(Json(report))
}

/// GET /report
async fn report(State(state): State<AppState>) -> Json<RouteReport> {
    Json(state.scheduler.routes().report())
}

/// Returns the router for the route table endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reload", post(reload))
        .route("/report", get(report))
}
