//! Silence endpoints (Alertmanager v2).
//!
//! A silence is a flat matcher list, so enforcement is the non-recursive
//! case of the selector rule: inject the tenant matcher, reject a
//! conflicting one. Updating an existing silence additionally requires that
//! the stored silence already belongs to the tenant.

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use promguard_core::error::{GateError, Result};
use promguard_core::promql::parse_filter_matcher;
use promguard_core::{MatchKind, Matcher};

use crate::context::TenantContext;
use crate::upstream::{Upstream, UpstreamRequest};

use super::params::RequestParams;

const FILTER: &str = "filter";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SilenceMatcher {
    pub name: String,
    pub value: String,
    #[serde(rename = "isRegex")]
    pub is_regex: bool,
    #[serde(rename = "isEqual", default, skip_serializing_if = "Option::is_none")]
    pub is_equal: Option<bool>,
}

impl SilenceMatcher {
    pub fn to_matcher(&self) -> Result<Matcher> {
        let kind = match (self.is_regex, self.is_equal.unwrap_or(true)) {
            (false, true) => MatchKind::Equal,
            (false, false) => MatchKind::NotEqual,
            (true, true) => MatchKind::Regexp,
            (true, false) => MatchKind::NotRegexp,
        };
        Matcher::new(self.name.clone(), kind, self.value.clone())
    }
}

impl From<&Matcher> for SilenceMatcher {
    fn from(m: &Matcher) -> Self {
        let (is_regex, is_equal) = match m.kind() {
            MatchKind::Equal => (false, true),
            MatchKind::NotEqual => (false, false),
            MatchKind::Regexp => (true, true),
            MatchKind::NotRegexp => (true, false),
        };
        Self {
            name: m.name().to_owned(),
            value: m.value().to_owned(),
            is_regex,
            is_equal: Some(is_equal),
        }
    }
}

/// Silence as posted or returned; fields other than `id`/`matchers` are
/// carried through untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Silence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub matchers: Vec<SilenceMatcher>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Silence {
    fn matchers(&self) -> Result<Vec<Matcher>> {
        self.matchers.iter().map(SilenceMatcher::to_matcher).collect()
    }
}

/// GET: enforce on the `filter` list.
pub fn enforce_filters(tenant: &TenantContext, params: &mut RequestParams) -> Result<()> {
    let mut filters = params
        .all(FILTER)
        .iter()
        .map(|f| parse_filter_matcher(f))
        .collect::<Result<Vec<_>>>()?;
    tenant.enforcer()?.enforce_matchers(&mut filters)?;
    params.set(FILTER, filters.iter().map(Matcher::to_string));
    Ok(())
}

/// POST: enforce on the silence body, returning the re-encoded body.
pub async fn enforce_body(
    tenant: &TenantContext,
    upstream: &dyn Upstream,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Bytes> {
    let mut silence: Silence = serde_json::from_slice(body)
        .map_err(|e| GateError::BadRequest(format!("invalid silence: {e}")))?;

    let mut matchers = silence.matchers()?;
    let before = matchers.len();
    tenant.enforcer()?.enforce_matchers(&mut matchers)?;
    silence
        .matchers
        .extend(matchers.iter().skip(before).map(SilenceMatcher::from));

    if let Some(id) = silence.id.as_deref().filter(|id| !id.is_empty()) {
        ensure_owned(tenant, upstream, headers, id).await?;
    }

    serde_json::to_vec(&silence)
        .map(Bytes::from)
        .map_err(|e| GateError::Internal(format!("encode silence: {e}")))
}

/// Fetch the stored silence `id` and check it carries the tenant matcher.
async fn ensure_owned(
    tenant: &TenantContext,
    upstream: &dyn Upstream,
    headers: &HeaderMap,
    id: &str,
) -> Result<()> {
    if id.contains('/') {
        return Err(GateError::BadRequest(format!("invalid silence id {id:?}")));
    }
    let mut fetch_headers = HeaderMap::new();
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        fetch_headers.insert(header::AUTHORIZATION, auth.clone());
    }
    fetch_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

    let resp = upstream
        .forward(UpstreamRequest {
            method: Method::GET,
            path: format!("/api/v2/silence/{id}"),
            query: String::new(),
            headers: fetch_headers,
            body: Bytes::new(),
        })
        .await?;

    let denied = || GateError::Forbidden(format!("silence {id} does not belong to tenant"));
    if resp.status != StatusCode::OK {
        warn!(%id, status = %resp.status, "silence lookup failed");
        return Err(denied());
    }
    let stored: Silence = serde_json::from_slice(&resp.body)
        .map_err(|e| GateError::UpstreamResponse(format!("decode silence: {e}")))?;

    let tenant_matcher = tenant.matcher()?;
    if stored.matchers()?.contains(&tenant_matcher) {
        Ok(())
    } else {
        Err(denied())
    }
}
