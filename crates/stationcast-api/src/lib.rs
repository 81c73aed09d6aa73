//! Stationcast API: administrative HTTP surface of the event scheduler.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::Router;

use crate::state::AppState;

/// Builds the application router without middleware layers.
pub fn app(app_state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/event", routes::event::router())
        .nest("/api/v1/participants", routes::participants::router())
        .nest("/api/v1/routes", routes::route_table::router())
        .with_state(app_state)
}
