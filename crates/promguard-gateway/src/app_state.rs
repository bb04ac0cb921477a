//! Shared application state.
//!
//! Everything here is immutable after startup apart from the metrics
//! registry, so handlers share it through a single `Arc`.

use std::sync::Arc;
use std::time::Duration;

use promguard_core::error::Result;

use crate::config::GatewayConfig;
use crate::dispatch::RouteTable;
use crate::obs::metrics::GatewayMetrics;
use crate::upstream::{HttpUpstream, Upstream};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    routes: RouteTable,
    upstream: Arc<dyn Upstream>,
    metrics: GatewayMetrics,
}

impl AppState {
    /// Build state with the HTTP upstream named in the config.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let upstream = HttpUpstream::new(
            &cfg.gateway.upstream,
            Duration::from_millis(cfg.gateway.upstream_timeout_ms),
        )?;
        Ok(Self::with_upstream(cfg, Arc::new(upstream)))
    }

    pub fn with_upstream(cfg: GatewayConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                routes: RouteTable::standard(),
                upstream,
                metrics: GatewayMetrics::default(),
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    pub fn upstream(&self) -> &dyn Upstream {
        self.inner.upstream.as_ref()
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }
}
