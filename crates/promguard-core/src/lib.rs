//! promguard core: label matchers, the PromQL front end, and the enforcer.
//!
//! This crate holds everything that decides *what* a tenant may read. It
//! carries no HTTP or runtime dependencies so the enforcement rules can be
//! tested in isolation from the gateway.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `GateError`/`Result`: a malformed query
//! is a client error, never a crashed worker.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod enforce;
pub mod error;
pub mod matcher;
pub mod promql;

/// Shared result type.
pub use error::{ClientCode, GateError, Result};
pub use enforce::Enforcer;
pub use matcher::{LabelPredicate, MatchKind, Matcher};
