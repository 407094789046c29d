//! Integration tests for `HttpSurveyTransport` using wiremock HTTP mocks.

use std::sync::Arc;

use hazard_map_hazard_models::BoundingBox;
use hazard_map_selection::SelectionPolygon;
use hazard_map_survey::{HttpSurveyTransport, SurveyError, SurveyOrchestrator};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orchestrator(server: &MockServer, grid_step: Option<f64>) -> SurveyOrchestrator {
    let transport = HttpSurveyTransport::new(
        reqwest::Client::new(),
        format!("{}/survey", server.uri()),
    );
    SurveyOrchestrator::new(Arc::new(transport), grid_step)
}

fn selection() -> SelectionPolygon {
    SelectionPolygon::from_vertices(vec![
        hazard_map_hazard_models::Coordinate::new(40.30, -74.70),
        hazard_map_hazard_models::Coordinate::new(40.32, -74.60),
        hazard_map_hazard_models::Coordinate::new(40.40, -74.65),
    ])
    .expect("valid triangle")
}

#[tokio::test]
async fn posts_bounding_box_and_marks_running() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/survey"))
        .and(body_json(serde_json::json!({
            "lat_min": 40.30,
            "lon_min": -74.70,
            "lat_max": 40.40,
            "lon_max": -74.60
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
            "ok": true,
            "message": "Survey processing started in the background."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut orchestrator = orchestrator(&server, None);
    orchestrator
        .submit(Some(&selection()))
        .await
        .expect("survey should start");

    assert!(orchestrator.job().running);
    assert!(!orchestrator.job().submitting);
}

#[tokio::test]
async fn includes_configured_grid_step() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({
            "lat_min": 40.30,
            "lon_min": -74.70,
            "lat_max": 40.40,
            "lon_max": -74.60,
            "grid_step": 0.002
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let polygon =
        SelectionPolygon::from_box(&BoundingBox::new(-74.70, 40.30, -74.60, 40.40)).unwrap();
    orchestrator(&server, Some(0.002))
        .submit(Some(&polygon))
        .await
        .expect("survey should start");
}

#[tokio::test]
async fn server_error_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let mut orchestrator = orchestrator(&server, None);
    let err = orchestrator
        .submit(Some(&selection()))
        .await
        .expect_err("500 should fail");

    assert!(matches!(err, SurveyError::Status { status: 500 }));
    assert_eq!(orchestrator.job().message, "Failed to start survey: HTTP 500");
    assert!(!orchestrator.job().running);
}

#[tokio::test]
async fn non_json_reply_is_not_accepted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let mut orchestrator = orchestrator(&server, None);
    let err = orchestrator
        .submit(Some(&selection()))
        .await
        .expect_err("non-JSON reply should fail");

    assert!(matches!(err, SurveyError::NotAccepted));
}
