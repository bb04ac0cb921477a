use axum::http::HeaderName;
use serde::Deserialize;
use url::Url;

use promguard_core::error::{GateError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    pub gateway: GatewaySection,

    pub tenant: TenantSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GateError::UnsupportedVersion);
        }
        self.gateway.validate()?;
        self.tenant.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Base URL of the query engine, e.g. `http://127.0.0.1:9090`.
    pub upstream: String,

    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.upstream)
            .map_err(|e| GateError::Config(format!("gateway.upstream is not a valid URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GateError::Config(
                "gateway.upstream must use http or https".into(),
            ));
        }
        if url.query().is_some() {
            return Err(GateError::Config(
                "gateway.upstream must not carry a query string".into(),
            ));
        }
        if !(100..=600_000).contains(&self.upstream_timeout_ms) {
            return Err(GateError::Config(
                "gateway.upstream_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(GateError::Config("gateway.max_body_bytes must be positive".into()));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_upstream_timeout_ms() -> u64 {
    30_000
}
fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

/// Where the tenant identifier travels on inbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantSource {
    #[default]
    Query,
    Header,
}

/// Handling of empty segments in a comma-separated tenant value (`a,,b`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyValues {
    #[default]
    Reject,
    Ignore,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantSection {
    /// Label enforced on every selector.
    pub label: String,

    #[serde(default)]
    pub source: TenantSource,

    /// Header or query parameter carrying the tenant; defaults to `label`.
    #[serde(default)]
    pub param: Option<String>,

    #[serde(default)]
    pub empty_values: EmptyValues,
}

impl TenantSection {
    pub fn param_name(&self) -> &str {
        self.param.as_deref().unwrap_or(&self.label)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_label_name(&self.label) {
            return Err(GateError::Config(format!(
                "tenant.label {:?} is not a valid label name",
                self.label
            )));
        }
        let param = self.param_name();
        if param.is_empty() {
            return Err(GateError::Config("tenant.param must not be empty".into()));
        }
        if self.source == TenantSource::Header && HeaderName::from_bytes(param.as_bytes()).is_err() {
            return Err(GateError::Config(format!(
                "tenant.param {param:?} is not a valid header name"
            )));
        }
        Ok(())
    }
}

fn is_label_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
