use axum::http::Method;

use promguard_core::error::{GateError, Result};

use crate::filter::ResponseFilter;

/// Request-stage rewrite applied before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Forward unchanged (read-only endpoints without selectors).
    Passthrough,
    /// Enforce on the `query` parameter.
    Query,
    /// Enforce on every `match[]` parameter.
    Series,
    /// Replace `match[]` with the tenant selector.
    Federate,
    /// Enforce on silence filters (GET) or the silence body (POST).
    Silences,
    /// Delete a silence by id.
    DeleteSilence,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Passthrough => "passthrough",
            Endpoint::Query => "query",
            Endpoint::Series => "series",
            Endpoint::Federate => "federate",
            Endpoint::Silences => "silences",
            Endpoint::DeleteSilence => "delete_silence",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(&'static str),
    /// Matches the whole subtree below a `/`-terminated prefix.
    Prefix(&'static str),
}

impl PathPattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == *p,
            PathPattern::Prefix(p) => path.len() > p.len() && path.starts_with(p),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: PathPattern,
    pub methods: Vec<Method>,
    pub endpoint: Endpoint,
    pub filter: Option<ResponseFilter>,
}

/// Immutable dispatch table, built once at startup.
///
/// Only enumerated paths are forwarded. Anything else, and any method not
/// listed for a known path, resolves to `NotFound`.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn standard() -> Self {
        use Endpoint::*;
        use PathPattern::{Exact, Prefix};

        let get = || vec![Method::GET];
        let get_post = || vec![Method::GET, Method::POST];
        let route = |pattern, methods, endpoint, filter| Route { pattern, methods, endpoint, filter };

        Self {
            routes: vec![
                route(Exact("/federate"), get(), Federate, None),
                route(Exact("/api/v1/query"), get_post(), Query, None),
                route(Exact("/api/v1/query_range"), get_post(), Query, None),
                route(Exact("/api/v1/series"), get_post(), Series, None),
                route(Exact("/api/v1/labels"), get(), Passthrough, None),
                route(Exact("/api/v1/label/__name__/values"), get(), Passthrough, None),
                route(Exact("/api/v1/alerts"), get(), Passthrough, Some(ResponseFilter::Alerts)),
                route(Exact("/api/v1/rules"), get(), Passthrough, Some(ResponseFilter::Rules)),
                route(Exact("/api/v2/silences"), get_post(), Silences, None),
                route(Prefix("/api/v2/silences/"), get_post(), Silences, None),
                route(Prefix("/api/v2/silence/"), vec![Method::DELETE], DeleteSilence, None),
            ],
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find the route for `path`/`method`.
    ///
    /// Paths with `.`/`..` or empty segments never match: the upstream
    /// would normalise them into a different endpoint than the one checked.
    pub fn resolve(&self, path: &str, method: &Method) -> Result<&Route> {
        if !is_clean(path) {
            return Err(GateError::NotFound);
        }
        self.routes
            .iter()
            .find(|r| r.pattern.matches(path))
            .filter(|r| r.methods.contains(method))
            .ok_or(GateError::NotFound)
    }
}

fn is_clean(path: &str) -> bool {
    path.starts_with('/')
        && path
            .split('/')
            .skip(1)
            .enumerate()
            .all(|(i, seg)| seg != "." && seg != ".." && (!seg.is_empty() || i == 0) && !seg.contains('%'))
}
