#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use tower::ServiceExt;
use url::form_urlencoded;

use promguard_core::error::Result;
use promguard_gateway::app_state::AppState;
use promguard_gateway::config;
use promguard_gateway::router::build_router;
use promguard_gateway::upstream::{Upstream, UpstreamRequest, UpstreamResponse};

pub const QUERY_CONFIG: &str = r#"
version: 1
gateway:
  upstream: "http://prometheus:9090"
tenant:
  label: namespace
"#;

pub const HEADER_CONFIG: &str = r#"
version: 1
gateway:
  upstream: "http://prometheus:9090"
tenant:
  label: namespace
  source: header
  param: X-Tenant
"#;

/// Records every forwarded request and answers from canned responses keyed
/// by path; unknown paths answer 200 with an empty success envelope.
#[derive(Default)]
pub struct MockUpstream {
    calls: Mutex<Vec<UpstreamRequest>>,
    responses: Mutex<HashMap<String, UpstreamResponse>>,
}

impl MockUpstream {
    pub fn respond(&self, path: &str, status: StatusCode, body: &str) {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        self.responses.lock().unwrap().insert(
            path.to_owned(),
            UpstreamResponse { status, headers, body: Bytes::from(body.to_owned()) },
        );
    }

    pub fn calls(&self) -> Vec<UpstreamRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> UpstreamRequest {
        self.calls().pop().unwrap()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn forward(&self, req: UpstreamRequest) -> Result<UpstreamResponse> {
        let resp = self.responses.lock().unwrap().get(&req.path).cloned();
        self.calls.lock().unwrap().push(req);
        Ok(resp.unwrap_or_else(|| UpstreamResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(br#"{"status":"success","data":[]}"#),
        }))
    }
}

pub struct Harness {
    pub router: Router,
    pub upstream: Arc<MockUpstream>,
    pub state: AppState,
}

pub fn harness(yaml: &str) -> Harness {
    let cfg = config::load_from_str(yaml).unwrap();
    let upstream = Arc::new(MockUpstream::default());
    let state = AppState::with_upstream(cfg, upstream.clone());
    Harness { router: build_router(state.clone()), upstream, state }
}

impl Harness {
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }
}

pub fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

/// Decoded pairs of a query string or form body.
pub fn pairs(raw: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(raw)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub fn values(raw: &[u8], key: &str) -> Vec<String> {
    pairs(raw)
        .into_iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v)
        .collect()
}

pub fn encode(v: &str) -> String {
    form_urlencoded::byte_serialize(v.as_bytes()).collect()
}
