//! Upstream transport.
//!
//! `Upstream` is the seam between the enforcement pipeline and the network:
//! production uses `HttpUpstream` (reqwest, pooled connections), tests plug
//! in a recording implementation to assert what did or did not leave the
//! gateway.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, Method, StatusCode};
use bytes::Bytes;
use url::Url;

use promguard_core::error::{GateError, Result};

/// A fully rewritten request, ready to leave the gateway.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub path: String,
    /// Encoded query string without the leading `?`.
    pub query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn forward(&self, req: UpstreamRequest) -> Result<UpstreamResponse>;
}

pub struct HttpUpstream {
    base: Url,
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| GateError::Config(format!("invalid upstream URL {base:?}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GateError::Config(format!("build upstream client: {e}")))?;
        Ok(Self { base, client })
    }

    fn url_for(&self, req: &UpstreamRequest) -> Url {
        let mut url = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{prefix}{}", req.path));
        url.set_query((!req.query.is_empty()).then_some(req.query.as_str()));
        url
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn forward(&self, req: UpstreamRequest) -> Result<UpstreamResponse> {
        let url = self.url_for(&req);
        let resp = self
            .client
            .request(req.method, url)
            .headers(req.headers)
            .body(req.body)
            .send()
            .await
            .map_err(|e| GateError::Upstream(e.to_string()))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| GateError::Upstream(format!("read body: {e}")))?;
        Ok(UpstreamResponse { status, headers, body })
    }
}

const HOP_BY_HOP: [header::HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

/// Drop connection-scoped headers and the stale body length.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove(header::CONTENT_LENGTH);
}
