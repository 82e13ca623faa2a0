mod common;

use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::{fake_registry, page, MockModel};
use ctgov_assistant::{
    api::{router, AppState},
    config::Settings,
    data::RegistryClient,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(mock: &Arc<MockModel>, registry_url: &str) -> Router {
    let settings = Settings {
        max_studies: 50,
        ..Settings::default()
    };
    let registry = RegistryClient::new(registry_url, Duration::from_secs(5)).unwrap();
    router(AppState::new(settings, common::model(mock), registry))
}

async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_model() {
    let mock = Arc::new(MockModel::replying("{}"));
    let (status, body) = call(app(&mock, "http://127.0.0.1:9"), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "mock-model");
}

#[tokio::test]
async fn query_endpoint_returns_preview() {
    let mock = Arc::new(MockModel::replying(r#"{"query.cond": "asthma"}"#));
    let (status, body) = call(
        app(&mock, "http://127.0.0.1:9"),
        "POST",
        "/api/query",
        Some(json!({ "patient": "children with asthma" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"]["query.cond"], "asthma");
    assert!(body["web_url"].as_str().unwrap().contains("cond=asthma"));
}

#[tokio::test]
async fn empty_criteria_map_to_bad_request() {
    let mock = Arc::new(MockModel::replying("{}"));
    let (status, body) = call(
        app(&mock, "http://127.0.0.1:9"),
        "POST",
        "/api/query",
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "user_input");
    assert_eq!(body["transient"], false);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn studies_endpoint_structures_results() {
    let registry = fake_registry(|_| (StatusCode::OK, page(&["NCT01", "NCT02"], None, 2))).await;
    let mock = Arc::new(MockModel::replying("{}"));
    let (status, body) = call(
        app(&mock, &registry.url),
        "POST",
        "/api/studies",
        Some(json!({ "query": { "query.cond": "diabetes" }, "max_records": 10 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["studies"][1]["nct_id"], "NCT02");
    assert_eq!(body["truncated"], false);
}

#[tokio::test]
async fn registry_outage_maps_to_bad_gateway() {
    let registry = fake_registry(|_| (StatusCode::SERVICE_UNAVAILABLE, String::new())).await;
    let mock = Arc::new(MockModel::replying("{}"));
    let (status, body) = call(
        app(&mock, &registry.url),
        "POST",
        "/api/studies",
        Some(json!({ "query": { "query.cond": "diabetes" } })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "registry_call");
    assert_eq!(body["transient"], true);
}

#[tokio::test]
async fn summaries_endpoint_runs_model() {
    let mock = Arc::new(MockModel::replying("概要"));
    let studies = vec![
        common::study("NCT01", &["Drug A"]),
        common::study("NCT02", &["Drug B"]),
    ];
    let (status, body) = call(
        app(&mock, "http://127.0.0.1:9"),
        "POST",
        "/api/summaries",
        Some(json!({ "kind": "comparison", "studies": studies })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "comparison");
    assert_eq!(body["text"], "概要");
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn overview_response_includes_distribution() {
    let mock = Arc::new(MockModel::replying("概要"));
    let studies = vec![
        common::study("NCT01", &["Drug A"]),
        common::study("NCT02", &["Drug A", "Drug B"]),
    ];
    let (status, body) = call(
        app(&mock, "http://127.0.0.1:9"),
        "POST",
        "/api/summaries",
        Some(json!({ "kind": "overview", "studies": studies })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["distribution"]["interventions"][0]["name"], "Drug A");
    assert_eq!(body["distribution"]["interventions"][0]["count"], 2);
    assert_eq!(body["distribution"]["primary_outcomes"][0]["count"], 2);
}

#[tokio::test]
async fn unknown_query_key_is_a_json_bad_request() {
    let mock = Arc::new(MockModel::replying("{}"));
    let (status, body) = call(
        app(&mock, "http://127.0.0.1:9"),
        "POST",
        "/api/studies",
        Some(json!({ "query": { "query.condition": "asthma" } })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "user_input");
    assert_eq!(body["transient"], false);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("did you mean `query.cond`"), "{error}");
    assert!(!error.contains("model output"), "{error}");
}

#[tokio::test]
async fn malformed_summary_body_is_a_json_bad_request() {
    let mock = Arc::new(MockModel::replying("{}"));
    let (status, body) = call(
        app(&mock, "http://127.0.0.1:9"),
        "POST",
        "/api/summaries",
        Some(json!({ "kind": "study" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "user_input");
    assert!(body["error"].as_str().unwrap().contains("study"));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn templates_are_listed() {
    let mock = Arc::new(MockModel::replying("{}"));
    let (status, body) = call(app(&mock, "http://127.0.0.1:9"), "GET", "/api/templates", None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 10);
    assert!(ids.contains(&"cross_study"));
}

#[tokio::test]
async fn unknown_template_is_not_found() {
    let mock = Arc::new(MockModel::replying("{}"));
    let (status, body) = call(
        app(&mock, "http://127.0.0.1:9"),
        "GET",
        "/api/templates/nope",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "template");
}

#[tokio::test]
async fn index_page_renders() {
    let mock = Arc::new(MockModel::replying("{}"));
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app(&mock, "http://127.0.0.1:9").oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("mock-model"));
    assert!(html.contains(r#"<option value="cross_study">"#));
}
