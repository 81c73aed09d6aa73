//! Routes for participant registration and reporting.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Deserialize;
use stationcast_core::error::DomainError;
use stationcast_core::participant::{NewParticipant, Participant};
use stationcast_scheduler::application::command_handlers;
use stationcast_scheduler::domain::commands;
use tracing::instrument;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct RegisterParticipantRequest {
    /// Channel address of the participant, e.g. a Telegram chat ID.
    pub recipient: String,
    /// Requested participant number; the next free one when absent.
    #[serde(default)]
    pub number: Option<u32>,
    /// Name shown in reports; defaults to the recipient.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// POST /
///
/// Registering an already known recipient returns the existing participant.
/// The participant store enforces the participant cap and number range.
#[instrument(skip(state, request), fields(number = ?request.number))]
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterParticipantRequest>,
) -> Result<Json<Participant>, ApiError> {
    let recipient = request.recipient.trim().to_owned();
    if recipient.is_empty() {
        return Err(DomainError::Validation("recipient must not be empty".into()).into());
    }
    let display_name = request
        .display_name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| recipient.clone());
    let participant = state
        .scheduler
        .register_participant(NewParticipant {
            number: request.number,
            recipient,
            display_name,
        })
        .await?;
    Ok(Json(participant))
}

/// POST /{id}/deactivate
#[instrument(skip(state))]
async fn deactivate(
    State(state): State<AppState>,
    Path(participant_id): Path<Uuid>,
) -> Result<Json<Participant>, ApiError> {
    let command = commands::DeactivateParticipant {
        correlation_id: Uuid::new_v4(),
        participant_id,
    };
    let participant =
        command_handlers::handle_deactivate_participant(&command, &state.scheduler).await?;
    Ok(Json(participant))
}

/// GET /report
async fn report(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let csv = state.scheduler.participant_report_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"participants.csv\"",
            ),
        ],
        csv,
    ))
}

/// Returns the router for the participant endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register))
        .route("/{id}/deactivate", post(deactivate))
        .route("/report", get(report))
}
