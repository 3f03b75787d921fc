use serde::Deserialize;
use twinguard_core::error::{Result, TwinGuardError};
use twinguard_core::model::{KeyLimits, Permission};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnforcerConfig {
    pub version: u32,

    #[serde(default)]
    pub enforcer: EnforcerSection,
}

impl EnforcerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TwinGuardError::UnsupportedVersion);
        }

        self.enforcer.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnforcerSection {
    /// Policy document loaded by the `twinguard-eval` binary.
    #[serde(default)]
    pub policy_file: Option<String>,

    #[serde(default = "default_resource_types")]
    pub resource_types: Vec<String>,

    #[serde(default = "default_max_path_depth")]
    pub max_path_depth: usize,

    #[serde(default = "default_permission")]
    pub default_permission: String,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for EnforcerSection {
    fn default() -> Self {
        Self {
            policy_file: None,
            resource_types: default_resource_types(),
            max_path_depth: default_max_path_depth(),
            default_permission: default_permission(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl EnforcerSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1024).contains(&self.max_path_depth) {
            return Err(TwinGuardError::BadRequest(
                "enforcer.max_path_depth must be between 1 and 1024".into(),
            ));
        }
        if !(1..=1_000_000).contains(&self.cache_capacity) {
            return Err(TwinGuardError::BadRequest(
                "enforcer.cache_capacity must be between 1 and 1000000".into(),
            ));
        }
        for ty in &self.resource_types {
            if ty.is_empty() || ty.contains(':') || ty.contains('/') {
                return Err(TwinGuardError::BadRequest(format!(
                    "enforcer.resource_types contains an invalid tag: {ty:?}"
                )));
            }
        }
        self.default_permission()?;
        Ok(())
    }

    pub fn default_permission(&self) -> Result<Permission> {
        self.default_permission.parse()
    }

    pub fn key_limits(&self) -> KeyLimits {
        KeyLimits {
            resource_types: self.resource_types.clone(),
            max_path_depth: self.max_path_depth,
        }
    }
}

fn default_resource_types() -> Vec<String> {
    vec!["thing".into(), "policy".into(), "message".into()]
}
fn default_max_path_depth() -> usize {
    64
}
fn default_permission() -> String {
    "READ".into()
}
fn default_cache_capacity() -> usize {
    1024
}
