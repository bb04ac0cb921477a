//! Request-scoped context types.
//!
//! The tenant scope is resolved once per request and handed to every later
//! step as a typed value, never looked up from a request-extension map.

pub mod tenant;

pub use tenant::TenantContext;
