//! Enforcer config loader (strict parsing).

pub mod schema;

use std::fs;

use twinguard_core::error::{Result, TwinGuardError};

pub use schema::{EnforcerConfig, EnforcerSection};

pub fn load_from_file(path: &str) -> Result<EnforcerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TwinGuardError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<EnforcerConfig> {
    let cfg: EnforcerConfig = serde_yaml::from_str(s)
        .map_err(|e| TwinGuardError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
