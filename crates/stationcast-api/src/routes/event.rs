//! Routes for starting, stopping and observing the event.

use axum::extract::{Query, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stationcast_core::event::Event;
use stationcast_core::outcome::DeliveryRecord;
use stationcast_scheduler::application::command_handlers;
use stationcast_scheduler::domain::commands;
use stationcast_scheduler::{BroadcastReport, EventStatus, Timetable};
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /start.
#[derive(Debug, Default, Deserialize)]
pub struct StartEventRequest {
    /// When the event clock starts; defaults to now.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

/// Request body for POST /broadcast.
#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    /// Message sent verbatim to every active participant.
    pub message: String,
}

/// Response body for GET /remaining.
#[derive(Debug, Serialize)]
pub struct RemainingResponse {
    /// Whether an event is running.
    pub running: bool,
    /// Seconds until the final station fires.
    pub remaining_secs: Option<i64>,
}

/// Query string of GET /outcomes.
#[derive(Debug, Default, Deserialize)]
pub struct OutcomesQuery {
    /// Event to report on; defaults to the running event.
    pub event_id: Option<Uuid>,
    /// Only each participant's latest record, and only if it needs follow-up.
    #[serde(default)]
    pub stuck: bool,
}

/// POST /start
#[instrument(skip(state, request))]
async fn start_event(
    State(state): State<AppState>,
    Json(request): Json<StartEventRequest>,
) -> Result<Json<Timetable>, ApiError> {
    let command = commands::StartEvent {
        correlation_id: Uuid::new_v4(),
        start_time: request.start_time,
    };
    let timetable = command_handlers::handle_start_event(&command, &state.scheduler).await?;
    Ok(Json(timetable))
}

/// POST /stop
#[instrument(skip(state))]
async fn stop_event(State(state): State<AppState>) -> Result<Json<Event>, ApiError> {
    let command = commands::StopEvent {
        correlation_id: Uuid::new_v4(),
    };
    let event = command_handlers::handle_stop_event(&command, &state.scheduler).await?;
    Ok(Json(event))
}

/// POST /broadcast
#[instrument(skip(state, request))]
async fn broadcast(
    State(state): State<AppState>,
    Json(request): Json<BroadcastRequest>,
) -> Result<Json<BroadcastReport>, ApiError> {
    let command = commands::Broadcast {
        correlation_id: Uuid::new_v4(),
        message: request.message,
    };
    let report = command_handlers::handle_broadcast(&command, &state.scheduler).await?;
    Ok(Json(report))
}

/// GET /remaining
async fn remaining(State(state): State<AppState>) -> Result<Json<RemainingResponse>, ApiError> {
    let remaining = state.scheduler.remaining_time().await?;
    Ok(Json(RemainingResponse {
        running: remaining.is_some(),
        remaining_secs: remaining.map(|r| r.num_seconds()),
    }))
}

/// GET /status
async fn status(State(state): State<AppState>) -> Result<Json<EventStatus>, ApiError> {
    Ok(Json(state.scheduler.status().await?))
}

/// GET /outcomes
async fn outcomes(
    State(state): State<AppState>,
    Query(query): Query<OutcomesQuery>,
) -> Result<Json<Vec<DeliveryRecord>>, ApiError> {
    let records = state
        .scheduler
        .outcomes(query.event_id, query.stuck)
        .await?;
    Ok(Json(records))
}

/// Returns the router for the event endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_event))
        .route("/stop", post(stop_event))
        .route("/broadcast", post(broadcast))
        .route("/remaining", get(remaining))
        .route("/status", get(status))
        .route("/outcomes", get(outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use stationcast_store::InMemoryParticipantStore;
    use stationcast_test_support::FailingEventStore;
    use tower::ServiceExt;

    use crate::state::testing::{app_state_with, test_app_state};

    fn failing_app_state() -> AppState {
        app_state_with(
            Arc::new(InMemoryParticipantStore::with_limit(10)),
            Arc::new(FailingEventStore),
        )
    }

    async fn send(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn test_start_returns_timetable() {
        // Arrange
        let app = router().with_state(test_app_state());

        // Act
        let (status, json) = send(app, "POST", "/start", "{}").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["slots"].as_array().unwrap().len(), 2);
        Uuid::parse_str(json["event_id"].as_str().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_start_returns_500_when_store_fails() {
        // Arrange
        let app = router().with_state(failing_app_state());

        // Act
        let (status, json) = send(app, "POST", "/start", "{}").await;

        // Assert
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "infrastructure_error");
    }

    #[tokio::test]
    async fn test_broadcast_returns_422_for_missing_message() {
        // Arrange
        let app = router().with_state(test_app_state());
        let request = Request::builder()
            .method("POST")
            .uri("/broadcast")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert: Axum returns 422 for deserialization failures.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_stop_returns_409_without_event() {
        let app = router().with_state(test_app_state());

        let (status, json) = send(app, "POST", "/stop", "").await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "state_conflict");
    }
}
