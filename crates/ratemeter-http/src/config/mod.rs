//! Config loader (strict parsing).

pub mod schema;

use std::fs;

use ratemeter_core::error::{RateMeterError, Result};

pub use schema::{MetricsSection, RateMeterConfig, ServerSection};

pub fn load_from_file(path: &str) -> Result<RateMeterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| RateMeterError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RateMeterConfig> {
    let cfg: RateMeterConfig = serde_yaml::from_str(s)
        .map_err(|e| RateMeterError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
