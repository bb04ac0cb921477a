//! Enforcement pipeline for every proxied request.
//!
//! tenant -> route -> rewrite -> forward -> filter. Each stage either hands
//! a narrower request to the next one or ends the request with an error
//! response; nothing reaches the upstream before all request-stage checks
//! have passed.

pub mod error;
pub mod params;
pub mod rewrite;
pub mod silences;

use std::time::Instant;

use axum::body::{self, Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use tracing::{error, info_span, warn, Instrument};

use promguard_core::error::{ClientCode, GateError, Result};

use crate::app_state::AppState;
use crate::config::TenantSource;
use crate::context::TenantContext;
use crate::dispatch::Endpoint;
use crate::upstream::{strip_hop_by_hop, UpstreamRequest};

use self::error::ApiError;
use self::params::RequestParams;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Fallback handler: everything that is not an ops endpoint.
pub async fn handle(State(state): State<AppState>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let span = info_span!("request", method = %parts.method, path = %parts.uri.path());

    async move {
        let metrics = state.metrics();
        metrics.inflight.inc();
        let mut endpoint = "unknown";
        let result = pipeline(&state, parts, body, &mut endpoint).await;
        metrics.inflight.dec();

        let response = match result {
            Ok(resp) => resp,
            Err(e) => {
                reject(&state, endpoint, &e);
                ApiError(e).into_response()
            }
        };
        metrics
            .requests
            .inc(&[("endpoint", endpoint), ("code", response.status().as_str())]);
        response
    }
    .instrument(span)
    .await
}

fn reject(state: &AppState, endpoint: &str, e: &GateError) {
    let code = e.client_code();
    state
        .metrics()
        .rejections
        .inc(&[("endpoint", endpoint), ("reason", code.as_str())]);
    match code {
        ClientCode::Unavailable | ClientCode::Internal => {
            error!(%endpoint, error = %e, "request failed")
        }
        ClientCode::BadData | ClientCode::Forbidden | ClientCode::NotFound => {
            warn!(%endpoint, tenant_label = %state.cfg().tenant.label, reason = code.as_str(), error = %e, "request rejected")
        }
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

async fn pipeline(
    state: &AppState,
    parts: Parts,
    body: Body,
    endpoint: &mut &'static str,
) -> Result<Response> {
    let cfg = state.cfg();
    let query = parts.uri.query();

    let tenant = TenantContext::extract(&cfg.tenant, &parts.headers, query)?;
    let route = state.routes().resolve(parts.uri.path(), &parts.method)?;
    *endpoint = route.endpoint.as_str();

    let body = body::to_bytes(body, cfg.gateway.max_body_bytes)
        .await
        .map_err(|e| GateError::BadRequest(format!("read request body: {e}")))?;

    // The upstream also reads query parameters from multipart bodies, which
    // are not rewritten here. Only form bodies may carry them through.
    let carries_params =
        parts.method == Method::POST && matches!(route.endpoint, Endpoint::Query | Endpoint::Series);
    let form = carries_params && is_form(&parts.headers);
    if carries_params && !form && !body.is_empty() {
        return Err(GateError::BadRequest(format!(
            "request body must be {FORM_CONTENT_TYPE}"
        )));
    }
    let form = form.then_some(&body[..]);
    let mut params = RequestParams::parse(query, form);

    let mut headers = parts.headers.clone();
    strip_hop_by_hop(&mut headers);
    match cfg.tenant.source {
        TenantSource::Query => params.remove(cfg.tenant.param_name()),
        TenantSource::Header => {
            headers.remove(cfg.tenant.param_name());
        }
    }
    if route.filter.is_some() {
        headers.remove(header::ACCEPT_ENCODING);
    }

    let mut out_body = body.clone();
    match route.endpoint {
        Endpoint::Passthrough | Endpoint::DeleteSilence => {}
        Endpoint::Query => rewrite::query(&tenant, &mut params)?,
        Endpoint::Series => rewrite::series(&tenant, &mut params)?,
        Endpoint::Federate => rewrite::federate(&tenant, &mut params)?,
        Endpoint::Silences if parts.method == Method::POST => {
            out_body =
                silences::enforce_body(&tenant, state.upstream(), &parts.headers, &body).await?;
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Endpoint::Silences => silences::enforce_filters(&tenant, &mut params)?,
    }
    if let Some(form) = params.form_body() {
        out_body = Bytes::from(form);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    }

    let started = Instant::now();
    let forwarded = state
        .upstream()
        .forward(UpstreamRequest {
            method: parts.method.clone(),
            path: parts.uri.path().to_owned(),
            query: params.query_string(),
            headers,
            body: out_body,
        })
        .await;
    state
        .metrics()
        .upstream_duration
        .observe(&[("endpoint", *endpoint)], started.elapsed());
    let mut resp = forwarded?;

    if let Some(filter) = route.filter.filter(|_| resp.status.is_success()) {
        if let Some(filtered) = filter.apply(&tenant.predicate()?, &resp.body)? {
            resp.body = Bytes::from(filtered);
            resp.headers.remove(header::CONTENT_ENCODING);
        }
    }
    strip_hop_by_hop(&mut resp.headers);

    Ok((resp.status, resp.headers, resp.body).into_response())
}
