//! In-process metrics, rendered in the Prometheus text format by `/metrics`.

pub mod metrics;
