//! Best-effort runtime configuration lookups
//!
//! Some adapters resolve tunable parameters (like the GameLift maximum player
//! session count) from an external configuration store at allocation time.
//! Lookups through `ConfigSource` are best-effort by contract: consumers must
//! degrade to a hardcoded default on any failure and never fail the
//! allocation because of one.

use crate::error::AllocatorError;
use crate::types::CallContext;
use async_trait::async_trait;
use std::env;
use tracing::debug;

/// Trait for best-effort runtime configuration value lookups
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch a configuration value under a namespace/key pair
    async fn get_value(
        &self,
        ctx: &CallContext,
        namespace: &str,
        key: &str,
    ) -> Result<String, AllocatorError>;
}

/// Config source backed by process environment variables
///
/// A lookup for namespace `gamelift` and key `my-queue` reads
/// `GAMELIFT_MY_QUEUE` (uppercased, non-alphanumerics folded to `_`).
#[derive(Debug, Default)]
pub struct EnvConfigSource;

impl EnvConfigSource {
    pub fn new() -> Self {
        Self
    }

    fn variable_name(namespace: &str, key: &str) -> String {
        format!("{}_{}", namespace, key)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[async_trait]
impl ConfigSource for EnvConfigSource {
    async fn get_value(
        &self,
        ctx: &CallContext,
        namespace: &str,
        key: &str,
    ) -> Result<String, AllocatorError> {
        let variable = Self::variable_name(namespace, key);
        debug!(
            "Resolving config value '{}' for environment '{}'",
            variable, ctx.environment_name
        );

        env::var(&variable).map_err(|_| AllocatorError::Configuration {
            message: format!("Config value '{}' is not set", variable),
        })
    }
}
