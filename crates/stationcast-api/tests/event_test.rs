//! Integration tests for the event endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

async fn register(app: &common::TestApp, recipient: &str) -> serde_json::Value {
    let (status, json) = common::post_json(
        app.router.clone(),
        "/api/v1/participants",
        &json!({ "recipient": recipient }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json
}

#[tokio::test]
async fn test_start_then_status_round_trip() {
    // Arrange
    let app = common::build_test_app();
    register(&app, "100").await;
    register(&app, "200").await;

    // Act
    let (status, timetable) =
        common::post_json(app.router.clone(), "/api/v1/event/start", &json!({})).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let slots = timetable["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0]["station"], 1);
    assert_eq!(slots[0]["fires_at"], "2026-01-15T10:01:00Z");

    let (status, json) = common::get_json(app.router.clone(), "/api/v1/event/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["running"], true);
    assert_eq!(json["event_id"], timetable["event_id"]);
    assert_eq!(json["current_station"], 0);
    assert_eq!(json["active_participants"], 2);
}

#[tokio::test]
async fn test_second_start_returns_409() {
    // Arrange
    let app = common::build_test_app();
    common::post_json(app.router.clone(), "/api/v1/event/start", &json!({})).await;

    // Act
    let (status, json) =
        common::post_json(app.router.clone(), "/api/v1/event/start", &json!({})).await;

    // Assert
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "state_conflict");
}

#[tokio::test]
async fn test_start_in_the_past_returns_400() {
    let app = common::build_test_app();

    let (status, json) = common::post_json(
        app.router,
        "/api/v1/event/start",
        &json!({ "start_time": "2026-01-15T09:00:00Z" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_start_at_future_time_is_reflected_in_timetable() {
    let app = common::build_test_app();

    let (status, json) = common::post_json(
        app.router,
        "/api/v1/event/start",
        &json!({ "start_time": "2026-01-15T11:00:00Z" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["start_time"], "2026-01-15T11:00:00Z");
    assert_eq!(json["slots"][1]["fires_at"], "2026-01-15T11:02:00Z");
}

#[tokio::test]
async fn test_remaining_reports_idle_then_running() {
    // Arrange
    let app = common::build_test_app();
    let (_, idle) = common::get_json(app.router.clone(), "/api/v1/event/remaining").await;

    // Act
    common::post_json(app.router.clone(), "/api/v1/event/start", &json!({})).await;
    let (status, running) = common::get_json(app.router.clone(), "/api/v1/event/remaining").await;

    // Assert
    assert_eq!(idle["running"], false);
    assert!(idle["remaining_secs"].is_null());
    assert_eq!(status, StatusCode::OK);
    assert_eq!(running["running"], true);
    assert_eq!(running["remaining_secs"], 120);
}

#[tokio::test]
async fn test_stop_returns_stopped_event() {
    // Arrange
    let app = common::build_test_app();
    let (_, timetable) =
        common::post_json(app.router.clone(), "/api/v1/event/start", &json!({})).await;

    // Act
    let (status, json) =
        common::post_json(app.router.clone(), "/api/v1/event/stop", &json!({})).await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], timetable["event_id"]);
    assert_eq!(json["active"], false);
    let (_, status_json) = common::get_json(app.router, "/api/v1/event/status").await;
    assert_eq!(status_json["running"], false);
}

#[tokio::test]
async fn test_stop_without_event_returns_409() {
    let app = common::build_test_app();

    let (status, _) = common::post_json(app.router, "/api/v1/event/stop", &json!({})).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_broadcast_reaches_registered_participants() {
    // Arrange
    let app = common::build_test_app();
    register(&app, "100").await;
    register(&app, "200").await;

    // Act
    let (status, json) = common::post_json(
        app.router.clone(),
        "/api/v1/event/broadcast",
        &json!({ "message": "Doors open" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["recipients"], 2);
    assert_eq!(json["delivered"], 2);
    assert_eq!(app.channel.messages_to("100"), vec!["Doors open"]);
}

#[tokio::test]
async fn test_broadcast_with_blank_message_returns_400() {
    let app = common::build_test_app();

    let (status, _) = common::post_json(
        app.router,
        "/api/v1/event/broadcast",
        &json!({ "message": "  " }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_outcomes_without_event_returns_409() {
    let app = common::build_test_app();

    let (status, _) = common::get_json(app.router, "/api/v1/event/outcomes").await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_outcomes_of_fresh_event_are_empty() {
    // Arrange
    let app = common::build_test_app();
    common::post_json(app.router.clone(), "/api/v1/event/start", &json!({})).await;

    // Act
    let (status, json) =
        common::get_json(app.router, "/api/v1/event/outcomes?stuck=true").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());
}
