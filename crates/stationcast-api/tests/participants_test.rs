//! Integration tests for the participant endpoints.

mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_register_assigns_first_free_number() {
    // Arrange
    let app = common::build_test_app();

    // Act
    let (status, json) = common::post_json(
        app.router.clone(),
        "/api/v1/participants",
        &json!({ "recipient": "4711", "display_name": "Ada" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["number"], 1);
    assert_eq!(json["recipient"], "4711");
    assert_eq!(json["display_name"], "Ada");
    assert_eq!(json["current_station"], 0);
    assert_eq!(json["active"], true);
    assert_eq!(json["registered_at"], "2026-01-15T10:00:00Z");
}

#[tokio::test]
async fn test_register_same_recipient_returns_existing_participant() {
    // Arrange
    let app = common::build_test_app();
    let (_, first) = common::post_json(
        app.router.clone(),
        "/api/v1/participants",
        &json!({ "recipient": "4711" }),
    )
    .await;

    // Act
    let (status, second) = common::post_json(
        app.router.clone(),
        "/api/v1/participants",
        &json!({ "recipient": "4711", "number": 3 }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["number"], 1);
    assert_eq!(second["display_name"], "4711");
}

#[tokio::test]
async fn test_register_blank_recipient_returns_400() {
    let app = common::build_test_app();

    let (status, json) = common::post_json(
        app.router,
        "/api/v1/participants",
        &json!({ "recipient": "   " }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_register_number_above_limit_returns_400() {
    let app = common::build_test_app();

    let (status, _) = common::post_json(
        app.router,
        "/api/v1/participants",
        &json!({ "recipient": "4711", "number": common::MAX_PARTICIPANTS + 1 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_taken_number_returns_409() {
    // Arrange
    let app = common::build_test_app();
    common::post_json(
        app.router.clone(),
        "/api/v1/participants",
        &json!({ "recipient": "a", "number": 2 }),
    )
    .await;

    // Act
    let (status, _) = common::post_json(
        app.router,
        "/api/v1/participants",
        &json!({ "recipient": "b", "number": 2 }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_past_participant_limit_returns_409() {
    // Arrange
    let app = common::build_test_app();
    for i in 0..common::MAX_PARTICIPANTS {
        let (status, _) = common::post_json(
            app.router.clone(),
            "/api/v1/participants",
            &json!({ "recipient": format!("r{i}") }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // Act
    let (status, json) = common::post_json(
        app.router,
        "/api/v1/participants",
        &json!({ "recipient": "one-too-many" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "state_conflict");
}

#[tokio::test]
async fn test_concurrent_registrations_never_exceed_participant_limit() {
    // Arrange
    let app = common::build_test_app();

    // Act
    let requests: Vec<_> = (0..common::MAX_PARTICIPANTS + 3)
        .map(|i| {
            let router = app.router.clone();
            tokio::spawn(async move {
                common::post_json(
                    router,
                    "/api/v1/participants",
                    &json!({ "recipient": format!("r{i}") }),
                )
                .await
                .0
            })
        })
        .collect();
    let mut statuses = Vec::new();
    for request in requests {
        statuses.push(request.await.unwrap());
    }

    // Assert
    let accepted = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let rejected = statuses
        .iter()
        .filter(|s| **s == StatusCode::CONFLICT)
        .count();
    assert_eq!(accepted, common::MAX_PARTICIPANTS as usize);
    assert_eq!(rejected, 3);
}

#[tokio::test]
async fn test_deactivate_excludes_participant_from_broadcast() {
    // Arrange
    let app = common::build_test_app();
    let (_, ada) = common::post_json(
        app.router.clone(),
        "/api/v1/participants",
        &json!({ "recipient": "ada" }),
    )
    .await;
    common::post_json(
        app.router.clone(),
        "/api/v1/participants",
        &json!({ "recipient": "bob" }),
    )
    .await;
    let uri = format!("/api/v1/participants/{}/deactivate", ada["id"].as_str().unwrap());

    // Act
    let (status, json) = common::post_json(app.router.clone(), &uri, &json!({})).await;
    let (_, report) = common::post_json(
        app.router,
        "/api/v1/event/broadcast",
        &json!({ "message": "hello" }),
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["active"], false);
    assert_eq!(report["recipients"], 1);
    assert!(app.channel.messages_to("ada").is_empty());
    assert_eq!(app.channel.messages_to("bob"), vec!["hello"]);
}

#[tokio::test]
async fn test_deactivate_unknown_participant_returns_404() {
    let app = common::build_test_app();
    let uri = format!("/api/v1/participants/{}/deactivate", uuid::Uuid::new_v4());

    let (status, json) = common::post_json(app.router, &uri, &json!({})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_report_is_csv_with_route_and_status() {
    // Arrange
    let app = common::build_test_app();
    common::post_json(
        app.router.clone(),
        "/api/v1/participants",
        &json!({ "recipient": "4711", "display_name": "Ada, the first" }),
    )
    .await;

    // Act
    let (status, body, content_type) =
        common::get_text(app.router, "/api/v1/participants/report").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.starts_with("text/csv"));
    let mut lines = body.lines();
    assert_eq!(
        lines.next().unwrap(),
        "participant_number,recipient,display_name,current_station,progress,route,status,registered_at"
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("001,4711,\"Ada, the first\",0,0/2,A-B,active,"));
    assert!(lines.next().is_none());
}
