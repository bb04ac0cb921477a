#![allow(clippy::unwrap_used)]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use common::{harness, json, QUERY_CONFIG};

const ALERTS: &str = r#"{
  "status": "success",
  "data": {
    "alerts": [
      {"labels": {"alertname": "A", "namespace": "a"}, "state": "firing", "value": "1"},
      {"labels": {"alertname": "B", "namespace": "b"}, "state": "firing", "value": "1"},
      {"labels": {"alertname": "C"}, "state": "pending", "value": "0"}
    ]
  }
}"#;

const RULES: &str = r#"{
  "status": "success",
  "data": {
    "groups": [
      {
        "name": "mixed",
        "file": "rules.yaml",
        "interval": 30,
        "rules": [
          {
            "name": "HighLoad",
            "type": "alerting",
            "labels": {"namespace": "a", "severity": "page"},
            "alerts": [
              {"labels": {"alertname": "HighLoad", "namespace": "a"}, "state": "firing"},
              {"labels": {"alertname": "HighLoad", "namespace": "b"}, "state": "firing"}
            ]
          },
          {"name": "job:up:sum", "type": "recording", "labels": {"namespace": "b"}},
          {"name": "global", "type": "recording", "labels": {}}
        ]
      },
      {
        "name": "other",
        "file": "rules.yaml",
        "rules": [{"name": "x", "type": "recording", "labels": {"namespace": "b"}}]
      }
    ]
  }
}"#;

#[tokio::test]
async fn alerts_are_filtered_by_tenant() {
    let h = harness(QUERY_CONFIG);
    h.upstream.respond("/api/v1/alerts", StatusCode::OK, ALERTS);

    let (status, _, body) = h.get("/api/v1/alerts?namespace=a").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "success");
    assert_eq!(
        body["data"]["alerts"],
        json!([{"labels": {"alertname": "A", "namespace": "a"}, "state": "firing", "value": "1"}])
    );
}

#[tokio::test]
async fn alerts_multi_tenant_keeps_every_owned_item() {
    let h = harness(QUERY_CONFIG);
    h.upstream.respond("/api/v1/alerts", StatusCode::OK, ALERTS);

    let (_, _, body) = h.get("/api/v1/alerts?namespace=a,b").await;
    let names: Vec<_> = json(&body)["data"]["alerts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["labels"]["alertname"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, ["A", "B"]);
}

#[tokio::test]
async fn rules_are_pruned_and_empty_groups_dropped() {
    let h = harness(QUERY_CONFIG);
    h.upstream.respond("/api/v1/rules", StatusCode::OK, RULES);

    let (status, _, body) = h.get("/api/v1/rules?namespace=a").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let groups = body["data"]["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["name"], "mixed");
    assert_eq!(groups[0]["interval"], 30);

    let rules = groups[0]["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["name"], "HighLoad");
    assert_eq!(rules[0]["labels"]["severity"], "page");
    let alerts = rules[0]["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["labels"]["namespace"], "a");
}

#[tokio::test]
async fn filtered_requests_ask_for_identity_encoding() {
    let h = harness(QUERY_CONFIG);
    h.upstream.respond("/api/v1/alerts", StatusCode::OK, ALERTS);

    let req = Request::get("/api/v1/alerts?namespace=a")
        .header("accept-encoding", "gzip")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = h.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.upstream.last().headers.get("accept-encoding").is_none());
    assert!(headers.get("content-encoding").is_none());
}

#[tokio::test]
async fn undecodable_payload_is_a_bad_gateway() {
    let h = harness(QUERY_CONFIG);
    h.upstream.respond("/api/v1/rules", StatusCode::OK, "<html>oops</html>");

    let (status, _, body) = h.get("/api/v1/rules?namespace=a").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body = json(&body);
    assert_eq!(body["errorType"], "unavailable");
    assert!(!body.to_string().contains("oops"));
}

#[tokio::test]
async fn unexpected_data_shape_is_a_bad_gateway() {
    let h = harness(QUERY_CONFIG);
    h.upstream
        .respond("/api/v1/alerts", StatusCode::OK, r#"{"status":"success","data":{"items":[]}}"#);

    let (status, _, _) = h.get("/api/v1/alerts?namespace=a").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn error_envelope_is_forwarded_verbatim() {
    let h = harness(QUERY_CONFIG);
    let err = r#"{"status":"error","errorType":"internal","error":"rule manager not ready"}"#;
    h.upstream.respond("/api/v1/rules", StatusCode::OK, err);

    let (status, _, body) = h.get("/api/v1/rules?namespace=a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], err.as_bytes());
}

#[tokio::test]
async fn non_success_status_is_not_filtered() {
    let h = harness(QUERY_CONFIG);
    h.upstream
        .respond("/api/v1/alerts", StatusCode::SERVICE_UNAVAILABLE, "unavailable");

    let (status, _, body) = h.get("/api/v1/alerts?namespace=a").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(&body[..], b"unavailable");
}
