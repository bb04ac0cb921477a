use axum::http::HeaderMap;
use url::form_urlencoded;

use promguard_core::error::{GateError, Result};
use promguard_core::{Enforcer, LabelPredicate, Matcher};

use crate::config::{EmptyValues, TenantSection, TenantSource};

/// Tenant scope of one request: the enforced label and its allowed values.
///
/// Only constructible with at least one value, so every consumer can build
/// a matcher without re-checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    label: String,
    values: Vec<String>,
}

impl TenantContext {
    pub fn new(label: impl Into<String>, values: Vec<String>) -> Result<Self> {
        let label = label.into();
        if values.is_empty() {
            return Err(GateError::MissingTenant(label));
        }
        Ok(Self { label, values })
    }

    /// Resolve the tenant from the configured header or query parameter.
    pub fn extract(cfg: &TenantSection, headers: &HeaderMap, query: Option<&str>) -> Result<Self> {
        let param = cfg.param_name();
        let raw = match cfg.source {
            TenantSource::Header => headers
                .get(param)
                .map(|v| {
                    v.to_str()
                        .map(str::to_owned)
                        .map_err(|_| GateError::BadRequest(format!("header {param:?} is not valid UTF-8")))
                })
                .transpose()?,
            TenantSource::Query => query.and_then(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .find(|(k, _)| k == param)
                    .map(|(_, v)| v.into_owned())
            }),
        };

        let raw = match raw {
            Some(r) if !r.is_empty() => r,
            _ => return Err(GateError::MissingTenant(param.to_owned())),
        };

        let mut values = Vec::new();
        for segment in raw.split(',') {
            if segment.is_empty() {
                match cfg.empty_values {
                    EmptyValues::Reject => {
                        return Err(GateError::BadRequest(format!(
                            "empty value in {param:?}: {raw:?}"
                        )))
                    }
                    EmptyValues::Ignore => continue,
                }
            }
            values.push(segment.to_owned());
        }
        if values.is_empty() {
            return Err(GateError::MissingTenant(param.to_owned()));
        }
        Self::new(cfg.label.clone(), values)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn matcher(&self) -> Result<Matcher> {
        Matcher::for_tenant(&self.label, &self.values)
    }

    pub fn enforcer(&self) -> Result<Enforcer> {
        Ok(Enforcer::new(vec![self.matcher()?]))
    }

    pub fn predicate(&self) -> Result<LabelPredicate> {
        self.matcher()?.compile()
    }
}
