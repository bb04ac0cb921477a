//! Response-stage tenant filtering for read-all endpoints.
//!
//! `/api/v1/alerts` and `/api/v1/rules` cannot be scoped at request time, so
//! their JSON payloads are decoded, pruned by label membership and
//! re-encoded. A payload that does not decode is an error: forwarding it
//! unfiltered would leak other tenants' items.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use promguard_core::error::{GateError, Result};
use promguard_core::LabelPredicate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFilter {
    Alerts,
    Rules,
}

impl ResponseFilter {
    /// Filter an upstream body.
    ///
    /// Returns `None` when the body must be forwarded verbatim (error
    /// envelopes carry no tenant data).
    pub fn apply(self, predicate: &LabelPredicate, body: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut envelope: Envelope = serde_json::from_slice(body)
            .map_err(|e| GateError::UpstreamResponse(format!("decode envelope: {e}")))?;
        if envelope.status != "success" {
            return Ok(None);
        }
        let Some(data) = envelope.data.take() else {
            return Ok(None);
        };

        let filtered = match self {
            ResponseFilter::Alerts => filter_alerts(predicate, data)?,
            ResponseFilter::Rules => filter_rules(predicate, data)?,
        };
        envelope.data = Some(filtered);

        serde_json::to_vec(&envelope)
            .map(Some)
            .map_err(|e| GateError::Internal(format!("encode filtered response: {e}")))
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct Envelope {
    status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// Any labelled item: an alert, or a rule.
#[derive(Debug, Deserialize, Serialize)]
struct Labelled {
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alerts: Option<Vec<Labelled>>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Deserialize, Serialize)]
struct AlertsData {
    alerts: Vec<Labelled>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RulesData {
    groups: Vec<RuleGroup>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Deserialize, Serialize)]
struct RuleGroup {
    rules: Vec<Labelled>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

fn owned_by(predicate: &LabelPredicate, item: &Labelled) -> bool {
    predicate.matches_label(item.labels.get(predicate.matcher().name()).map(String::as_str))
}

fn retain_owned(predicate: &LabelPredicate, items: &mut Vec<Labelled>) {
    items.retain(|item| owned_by(predicate, item));
}

fn filter_alerts(predicate: &LabelPredicate, data: Value) -> Result<Value> {
    let mut data: AlertsData = serde_json::from_value(data)
        .map_err(|e| GateError::UpstreamResponse(format!("decode alerts: {e}")))?;
    retain_owned(predicate, &mut data.alerts);
    to_value(&data)
}

fn filter_rules(predicate: &LabelPredicate, data: Value) -> Result<Value> {
    let mut data: RulesData = serde_json::from_value(data)
        .map_err(|e| GateError::UpstreamResponse(format!("decode rules: {e}")))?;
    for group in &mut data.groups {
        retain_owned(predicate, &mut group.rules);
        for rule in &mut group.rules {
            if let Some(alerts) = rule.alerts.as_mut() {
                retain_owned(predicate, alerts);
            }
        }
    }
    data.groups.retain(|g| !g.rules.is_empty());
    to_value(&data)
}

fn to_value<T: Serialize>(v: &T) -> Result<Value> {
    serde_json::to_value(v).map_err(|e| GateError::Internal(format!("encode filtered data: {e}")))
}
