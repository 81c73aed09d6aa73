//! Stationcast: API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use stationcast_core::error::DomainError;
use stationcast_routes::{CatalogError, RouteLoadError};
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    /// The route table could not be loaded at startup.
    #[error("route table error: {0}")]
    Routes(#[from] RouteLoadError),

    /// The station catalog could not be loaded at startup.
    #[error("station catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Tracing or span export could not be initialized.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// The scheduler failed while recovering the running event.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] DomainError),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Every problem found in a rejected route table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// A domain rule or store failure.
    Domain(DomainError),
    /// A route table that could not be read or failed validation.
    Routes(RouteLoadError),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<RouteLoadError> for ApiError {
    fn from(err: RouteLoadError) -> Self {
        Self::Routes(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, issues) = match &self {
            Self::Domain(err) => {
                let (status, code) = match err {
                    DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                    DomainError::StateConflict(_) => (StatusCode::CONFLICT, "state_conflict"),
                    DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                    DomainError::Infrastructure(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
                    }
                };
                (status, code, Vec::new())
            }
            Self::Routes(RouteLoadError::Invalid(issues)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_routes",
                issues.iter().map(ToString::to_string).collect(),
            ),
            Self::Routes(RouteLoadError::Io { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "route_source_unreadable",
                Vec::new(),
            ),
        };

        let message = match &self {
            Self::Domain(err) => err.to_string(),
            Self::Routes(err) => err.to_string(),
        };

        let body = ErrorBody {
            error: error_code,
            message,
            issues,
        };

        (status, Json(body)).into_response()
    }
}
