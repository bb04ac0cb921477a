//! Shared error type across promguard crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed query.
    BadData,
    /// Request is valid but touches data outside the tenant scope.
    Forbidden,
    /// Unknown path or method.
    NotFound,
    /// Upstream unreachable or returned something we cannot filter.
    Unavailable,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used as `errorType` in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadData => "bad_data",
            ClientCode::Forbidden => "forbidden",
            ClientCode::NotFound => "not_found",
            ClientCode::Unavailable => "unavailable",
            ClientCode::Internal => "internal",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, GateError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("bad request: the {0:?} parameter must be provided")]
    MissingTenant(String),
    #[error("parse error at char {pos}: {msg}")]
    Parse { pos: usize, msg: String },
    #[error("label matcher conflict: query has {existing}, tenant requires {enforced}")]
    Conflict { existing: String, enforced: String },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found")]
    NotFound,
    #[error("upstream: {0}")]
    Upstream(String),
    #[error("invalid upstream response: {0}")]
    UpstreamResponse(String),
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl GateError {
    pub(crate) fn parse(pos: usize, msg: impl Into<String>) -> Self {
        GateError::Parse { pos, msg: msg.into() }
    }

    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            GateError::BadRequest(_)
            | GateError::MissingTenant(_)
            | GateError::Parse { .. }
            | GateError::Conflict { .. } => ClientCode::BadData,
            GateError::Forbidden(_) => ClientCode::Forbidden,
            GateError::NotFound => ClientCode::NotFound,
            GateError::Upstream(_) | GateError::UpstreamResponse(_) => ClientCode::Unavailable,
            GateError::Config(_) | GateError::UnsupportedVersion | GateError::Internal(_) => {
                ClientCode::Internal
            }
        }
    }
}
