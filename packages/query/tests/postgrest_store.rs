//! Integration tests for `PostgrestHazardStore` using wiremock HTTP mocks.

use std::sync::Arc;

use hazard_map_query::{HazardQueryEngine, HazardStore, PostgrestHazardStore, QueryError};
use hazard_map_query_models::{FacetKind, FilterState, HazardQuery};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_store(server: &MockServer) -> PostgrestHazardStore {
    PostgrestHazardStore::new(reqwest::Client::new(), server.uri()).with_api_key("anon-key")
}

fn rows() -> serde_json::Value {
    serde_json::json!([
        {"id": "1", "lat": 40.35, "lng": -74.66, "hazard_type": "pothole", "severity": 4, "source": "public"},
        {"id": "2", "lat": 40.36, "lng": -74.65, "hazard_type": "crack", "severity": 2, "source": "survey"},
        {"id": "3", "lat": 40.37, "lng": -74.64, "hazard_type": " crack ", "severity": 5, "source": ""},
        {"id": "4", "lat": 40.38}
    ])
}

#[tokio::test]
async fn fetch_sends_filters_and_auth_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/hazards"))
        .and(query_param("select", "*"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "5000"))
        .and(query_param("hazard_type", "in.(\"pothole\")"))
        .and(query_param("severity", "gte.3"))
        .and(header("apikey", "anon-key"))
        .and(header("Authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": "1", "lat": 40.35, "lng": -74.66, "hazard_type": "pothole", "severity": 4}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut filters = FilterState::default();
    filters.toggle(FacetKind::Type, "pothole");
    filters.set_min_severity(3);

    let engine = HazardQueryEngine::new(Arc::new(test_store(&server)));
    let hazards = engine
        .fetch_hazards(&filters)
        .await
        .expect("query should succeed");

    assert_eq!(hazards.len(), 1);
    assert_eq!(hazards[0].id, "1");
}

#[tokio::test]
async fn facet_stats_come_from_unfiltered_snapshot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/hazards"))
        .and(query_param("limit", "5000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows()))
        .expect(1)
        .mount(&server)
        .await;

    let engine = HazardQueryEngine::new(Arc::new(test_store(&server)));
    let stats = engine
        .fetch_facet_stats()
        .await
        .expect("snapshot should succeed");

    let types: Vec<_> = stats
        .type_stats
        .iter()
        .map(|c| (c.value.as_str(), c.count))
        .collect();
    assert_eq!(types, vec![("crack", 2), ("pothole", 1)]);

    let sources: Vec<_> = stats
        .source_stats
        .iter()
        .map(|c| (c.value.as_str(), c.count))
        .collect();
    assert_eq!(sources, vec![("public", 1), ("survey", 1)]);
}

#[tokio::test]
async fn error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = test_store(&server)
        .fetch(&HazardQuery::unfiltered())
        .await
        .expect_err("401 should fail");

    match err {
        QueryError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
