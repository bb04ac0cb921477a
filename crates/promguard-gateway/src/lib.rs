//! promguard gateway library entry.
//!
//! Wires tenant extraction, the endpoint table, request rewriting, the
//! upstream client and response filtering into an axum `Router`. Consumed
//! by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod filter;
pub mod obs;
pub mod ops;
pub mod proxy;
pub mod router;
pub mod upstream;
