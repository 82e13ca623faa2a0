mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{fake_registry, page};
use ctgov_assistant::{
    data::RegistryClient,
    error::{AssistantError, RegistryFailure},
    query::StructuredQuery,
    retry::RetryPolicy,
};

fn query() -> StructuredQuery {
    StructuredQuery::from_model_output(r#"{"query.cond": "type 2 diabetes"}"#).unwrap()
}

fn client(url: &str) -> RegistryClient {
    RegistryClient::new(url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn follows_token_then_stops() {
    let registry = fake_registry(|params| match params.get("pageToken").map(String::as_str) {
        None => (StatusCode::OK, page(&["NCT01", "NCT02"], Some("abc"), 3)),
        Some("abc") => (StatusCode::OK, page(&["NCT03"], None, 3)),
        Some(other) => (StatusCode::BAD_REQUEST, format!("unexpected token {other}")),
    })
    .await;

    let results = client(&registry.url).search(&query(), 100).await.unwrap();

    let ids: Vec<_> = results.studies.iter().filter_map(|s| s.nct_id()).collect();
    assert_eq!(ids, ["NCT01", "NCT02", "NCT03"]);
    assert_eq!(results.total_count, Some(3));
    assert_eq!(results.pages, 2);
    assert!(!results.truncated);
    assert_eq!(registry.tokens_requested(), [None, Some("abc".to_string())]);
}

#[tokio::test]
async fn client_owns_paging_parameters() {
    let registry = fake_registry(|_| (StatusCode::OK, page(&["NCT01"], None, 1))).await;
    let query = StructuredQuery::from_model_output(
        r#"{"query.cond": "asthma", "format": "csv", "pageSize": 5000, "pageToken": "stale"}"#,
    )
    .unwrap();

    client(&registry.url).search(&query, 10).await.unwrap();

    let requests = registry.requests.lock().unwrap();
    let first = &requests[0];
    assert_eq!(first["query.cond"], "asthma");
    assert_eq!(first["format"], "json");
    assert_eq!(first["countTotal"], "true");
    assert_eq!(first["pageSize"], "1000");
    assert!(!first.contains_key("pageToken"));
}

#[tokio::test]
async fn repeated_token_is_an_error() {
    let registry = fake_registry(|params| match params.get("pageToken") {
        None => (StatusCode::OK, page(&["NCT01"], Some("loop"), 10)),
        Some(_) => (StatusCode::OK, page(&["NCT02"], Some("loop"), 10)),
    })
    .await;

    let err = client(&registry.url).search(&query(), 100).await.unwrap_err();

    assert!(matches!(err, AssistantError::RegistryPaginationExhausted { pages: 2, .. }));
    assert_eq!(registry.request_count(), 2);
}

#[tokio::test]
async fn page_bound_stops_endless_registry() {
    let registry = fake_registry(|params| {
        let n: usize = params
            .get("pageToken")
            .and_then(|t| t.trim_start_matches('t').parse().ok())
            .unwrap_or(0);
        let next = format!("t{}", n + 1);
        (StatusCode::OK, page(&["NCT"], Some(next.as_str()), 1_000_000))
    })
    .await;

    let err = client(&registry.url)
        .with_max_pages(3)
        .search(&query(), usize::MAX)
        .await
        .unwrap_err();

    assert!(matches!(err, AssistantError::RegistryPaginationExhausted { pages: 3, .. }));
    assert_eq!(registry.request_count(), 3);
}

#[tokio::test]
async fn max_records_truncates_without_extra_requests() {
    let registry = fake_registry(|params| match params.get("pageToken") {
        None => (StatusCode::OK, page(&["NCT01", "NCT02", "NCT03"], Some("next"), 9)),
        Some(_) => (StatusCode::OK, page(&["NCT04", "NCT05", "NCT06"], Some("more"), 9)),
    })
    .await;

    let results = client(&registry.url).search(&query(), 2).await.unwrap();

    assert_eq!(results.studies.len(), 2);
    assert!(results.truncated);
    assert_eq!(registry.request_count(), 1);
}

#[tokio::test]
async fn error_status_is_registry_failure() {
    let registry =
        fake_registry(|_| (StatusCode::INTERNAL_SERVER_ERROR, "upstream down".to_string())).await;

    let err = client(&registry.url).search(&query(), 10).await.unwrap_err();

    match &err {
        AssistantError::RegistryCall(RegistryFailure::Status { status, body }) => {
            assert_eq!(*status, 500);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn bad_request_is_not_transient() {
    let registry = fake_registry(|_| (StatusCode::BAD_REQUEST, "bad filter".to_string())).await;

    let err = client(&registry.url)
        .with_retry(RetryPolicy::with_retries(3, Duration::from_millis(1)))
        .search(&query(), 10)
        .await
        .unwrap_err();

    assert!(!err.is_transient());
    assert_eq!(registry.request_count(), 1);
}

#[tokio::test]
async fn transient_status_is_retried_by_policy() {
    let hits = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = hits.clone();
    let registry = fake_registry(move |_| {
        if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
            (StatusCode::SERVICE_UNAVAILABLE, "busy".to_string())
        } else {
            (StatusCode::OK, page(&["NCT01"], None, 1))
        }
    })
    .await;

    let results = client(&registry.url)
        .with_retry(RetryPolicy::with_retries(2, Duration::from_millis(1)))
        .search(&query(), 10)
        .await
        .unwrap();

    assert_eq!(results.studies.len(), 1);
    assert_eq!(registry.request_count(), 2);
}

#[tokio::test]
async fn malformed_body_is_reported() {
    let registry = fake_registry(|_| (StatusCode::OK, "<html>not json</html>".to_string())).await;

    let err = client(&registry.url).search(&query(), 10).await.unwrap_err();

    assert!(matches!(
        err,
        AssistantError::RegistryCall(RegistryFailure::Malformed(_))
    ));
}

#[tokio::test]
async fn unreachable_registry_is_network_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}/api/v2/studies"))
        .search(&query(), 10)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AssistantError::RegistryCall(RegistryFailure::Network(_))
    ));
    assert!(err.is_transient());
}

#[tokio::test]
async fn records_structure_into_studies() {
    let registry = fake_registry(|_| (StatusCode::OK, page(&["NCT09"], None, 1))).await;

    let results = client(&registry.url).search(&query(), 10).await.unwrap();
    let studies = results.structured();

    assert_eq!(studies.len(), 1);
    assert_eq!(studies[0].nct_id, "NCT09");
    assert_eq!(studies[0].status.as_deref(), Some("RECRUITING"));
    assert_eq!(studies[0].intervention_names(), ["Empagliflozin"]);
}
