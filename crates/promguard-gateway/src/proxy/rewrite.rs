//! Request-stage rewrites for the PromQL-bearing endpoints.

use tracing::debug;

use promguard_core::error::Result;
use promguard_core::promql::parse_expr;
use promguard_core::Enforcer;

use crate::context::TenantContext;

use super::params::RequestParams;

const QUERY: &str = "query";
const MATCH: &str = "match[]";

fn enforce_text(enforcer: &Enforcer, text: &str) -> Result<String> {
    let expr = enforcer.enforce(parse_expr(text)?)?;
    Ok(expr.to_string())
}

/// `query` / `query_range`: a missing query fails to parse, like an empty one.
pub fn query(tenant: &TenantContext, params: &mut RequestParams) -> Result<()> {
    let enforcer = tenant.enforcer()?;
    let original = params.first(QUERY).unwrap_or_default().to_owned();
    let rewritten = enforce_text(&enforcer, &original)?;
    debug!(%original, %rewritten, "query enforced");
    params.set(QUERY, [rewritten]);
    Ok(())
}

/// `series`: every `match[]` is enforced independently, order preserved.
/// No `match[]` at all is left for the upstream to judge.
pub fn series(tenant: &TenantContext, params: &mut RequestParams) -> Result<()> {
    let selectors = params.all(MATCH);
    if selectors.is_empty() {
        return Ok(());
    }
    let enforcer = tenant.enforcer()?;
    let rewritten = selectors
        .iter()
        .map(|s| enforce_text(&enforcer, s))
        .collect::<Result<Vec<_>>>()?;
    debug!(?rewritten, "series selectors enforced");
    params.set(MATCH, rewritten);
    Ok(())
}

/// `federate`: the tenant selector replaces whatever the client sent.
pub fn federate(tenant: &TenantContext, params: &mut RequestParams) -> Result<()> {
    let selector = format!("{{{}}}", tenant.matcher()?);
    params.set(MATCH, [selector]);
    Ok(())
}
