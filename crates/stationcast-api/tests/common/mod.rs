//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use stationcast_core::clock::Clock;
use stationcast_core::repository::EventStateStore;
use stationcast_dispatch::{BatchDispatcher, DispatchConfig};
use stationcast_routes::RouteTable;
use stationcast_scheduler::{Collaborators, EventScheduler, PlainComposer, SchedulerConfig};
use stationcast_store::{InMemoryEventStore, InMemoryOutcomeLog, InMemoryParticipantStore};
use stationcast_test_support::{FixedClock, RecordingChannel};
use tower::ServiceExt;

use stationcast_api::app;
use stationcast_api::state::AppState;

/// Routes for three participants over two stations.
pub const ROUTES_CSV: &str = "participant_number,station_1,station_2\n1,A,B\n2,B,C\n3,C,A\n";

/// Participant cap of the test app.
pub const MAX_PARTICIPANTS: u32 = 5;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// The router plus handles on its fakes.
pub struct TestApp {
    pub router: Router,
    pub channel: Arc<RecordingChannel>,
    pub scheduler: EventScheduler,
}

/// Build the full app router over in-memory stores, a recording channel and
/// a fixed clock. Uses the same route structure as `main.rs`.
pub fn build_test_app() -> TestApp {
    build_test_app_with(Arc::new(InMemoryEventStore::new()))
}

/// Build the app with a custom event store (e.g. a failing one).
pub fn build_test_app_with(events: Arc<dyn EventStateStore>) -> TestApp {
    let channel = Arc::new(RecordingChannel::new());
    let config = SchedulerConfig {
        total_stations: 2,
        station_duration: chrono::TimeDelta::minutes(1),
        ..SchedulerConfig::default()
    };
    let scheduler = EventScheduler::new(
        config,
        Collaborators {
            clock: fixed_clock(),
            participants: Arc::new(InMemoryParticipantStore::with_limit(MAX_PARTICIPANTS)),
            events,
            outcomes: Arc::new(InMemoryOutcomeLog::new()),
            dispatcher: BatchDispatcher::new(channel.clone(), DispatchConfig::default()),
            composer: Arc::new(PlainComposer),
        },
        RouteTable::load(ROUTES_CSV, 2, MAX_PARTICIPANTS).unwrap(),
    );
    let app_state = AppState::new(
        scheduler.clone(),
        PathBuf::from("does/not/exist.csv"),
        MAX_PARTICIPANTS,
    );

    TestApp {
        router: app(app_state),
        channel,
        scheduler,
    }
}

async fn read_json(request: Request<Body>, app: Router) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    read_json(request, app).await
}

/// Send a POST request with a plain-text body and return the JSON response.
pub async fn post_text(app: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "text/csv")
        .body(Body::from(body.to_owned()))
        .unwrap();

    read_json(request, app).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    read_json(request, app).await
}

/// Send a GET request and return the raw body and content type.
pub async fn get_text(app: Router, uri: &str) -> (StatusCode, String, String) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    (status, String::from_utf8(body_bytes.to_vec()).unwrap(), content_type)
}
