//! Secret retrieval for backend credentials
//!
//! Adapters never read credentials directly; they go through a
//! `SecretSource` so deployments can decide where secrets live and tests can
//! substitute doubles. A failed lookup is always terminal for the current
//! call and surfaces as a `Configuration` error.

use crate::error::AllocatorError;
use crate::types::CallContext;
use async_trait::async_trait;
use std::env;
use tracing::debug;

/// A resolved secret value
#[derive(Clone)]
pub struct Secret {
    pub value: String,
}

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Trait for resolving named secrets
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Resolve the named secret for the calling context
    async fn get_secret(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<Secret, AllocatorError>;
}

/// Secret source backed by process environment variables
///
/// The deployment injects secrets as environment variables named exactly
/// after the secret (e.g. `AWS_SECRET_ACCESS_KEY`).
#[derive(Debug, Default)]
pub struct EnvSecretSource;

impl EnvSecretSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn get_secret(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<Secret, AllocatorError> {
        debug!(
            "Resolving secret '{}' for environment '{}'",
            name, ctx.environment_name
        );

        match env::var(name) {
            Ok(value) if !value.is_empty() => Ok(Secret::new(value)),
            Ok(_) => Err(AllocatorError::Configuration {
                message: format!("Secret '{}' is empty", name),
            }),
            Err(_) => Err(AllocatorError::Configuration {
                message: format!("Secret '{}' is not set", name),
            }),
        }
    }
}
