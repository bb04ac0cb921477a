#![allow(clippy::unwrap_used)]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};

use common::{harness, json, values, HEADER_CONFIG, QUERY_CONFIG};

#[tokio::test]
async fn missing_tenant_is_rejected_before_upstream() {
    let h = harness(QUERY_CONFIG);
    let (status, _, body) = h.get("/api/v1/query?query=up").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = json(&body);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errorType"], "bad_data");
    assert!(body["error"].as_str().unwrap().contains("namespace"));
    assert!(h.upstream.calls().is_empty());
}

#[tokio::test]
async fn empty_tenant_is_rejected() {
    let h = harness(QUERY_CONFIG);
    let (status, _, _) = h.get("/api/v1/query?query=up&namespace=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.upstream.calls().is_empty());
}

#[tokio::test]
async fn tenant_is_checked_before_routing() {
    let h = harness(QUERY_CONFIG);
    let (status, _, _) = h.get("/api/v1/unknown").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = h.get("/api/v1/unknown?namespace=a").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tenant_param_is_not_forwarded() {
    let h = harness(QUERY_CONFIG);
    let (status, _, _) = h.get("/api/v1/labels?namespace=a&start=1").await;
    assert_eq!(status, StatusCode::OK);

    let sent = h.upstream.last();
    assert!(values(sent.query.as_bytes(), "namespace").is_empty());
    assert_eq!(values(sent.query.as_bytes(), "start"), ["1"]);
}

#[tokio::test]
async fn multiple_values_become_an_alternation() {
    let h = harness(QUERY_CONFIG);
    let (status, _, _) = h.get("/api/v1/query?query=up&namespace=a,b").await;
    assert_eq!(status, StatusCode::OK);

    let sent = h.upstream.last();
    assert_eq!(
        values(sent.query.as_bytes(), "query"),
        [r#"up{namespace=~"^(?:a|b)$"}"#]
    );
}

#[tokio::test]
async fn empty_segment_is_rejected_by_default() {
    let h = harness(QUERY_CONFIG);
    let (status, _, _) = h.get("/api/v1/query?query=up&namespace=a,,b").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.upstream.calls().is_empty());
}

#[tokio::test]
async fn empty_segment_can_be_ignored() {
    let yaml = format!("{QUERY_CONFIG}  empty_values: ignore\n");
    let h = harness(&yaml);
    let (status, _, _) = h.get("/api/v1/query?query=up&namespace=a,").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        values(h.upstream.last().query.as_bytes(), "query"),
        [r#"up{namespace="a"}"#]
    );

    let (status, _, _) = h.get("/api/v1/query?query=up&namespace=,").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn header_source_reads_and_strips_the_header() {
    let h = harness(HEADER_CONFIG);
    let req = Request::get("/api/v1/query?query=up")
        .header("x-tenant", "team-a")
        .header("authorization", "Bearer t")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = h.send(req).await;
    assert_eq!(status, StatusCode::OK);

    let sent = h.upstream.last();
    assert!(sent.headers.get("x-tenant").is_none());
    assert_eq!(sent.headers.get("authorization").unwrap(), "Bearer t");
    assert_eq!(
        values(sent.query.as_bytes(), "query"),
        [r#"up{namespace="team-a"}"#]
    );
}

#[tokio::test]
async fn header_source_ignores_the_query_parameter() {
    let h = harness(HEADER_CONFIG);
    let (status, _, _) = h.get("/api/v1/query?query=up&X-Tenant=a").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.upstream.calls().is_empty());
}
