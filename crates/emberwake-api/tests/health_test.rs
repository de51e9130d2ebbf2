//! Integration tests for the health endpoint.

mod common;

use axum::http::StatusCode;

#[tokio::test]
async fn test_health_reports_loaded_content() {
    // Arrange
    let app = common::build_test_app();

    // Act
    let (status, body) = common::get_json(app, "/health").await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["content_fingerprint"].as_str().unwrap().len(), 64);
    assert_eq!(body["subscribers"]["dialogue.option_chosen"], 1);
    assert_eq!(body["subscribers"]["location.visited"], 1);
}
