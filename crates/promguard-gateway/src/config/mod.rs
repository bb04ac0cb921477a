//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use promguard_core::error::{GateError, Result};

pub use schema::{EmptyValues, GatewayConfig, GatewaySection, TenantSection, TenantSource};

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| GateError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| GateError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
