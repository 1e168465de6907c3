//! Test fixtures and mock implementations for integration testing

use async_trait::async_trait;
use fleet_allocator::error::AllocatorError;
use fleet_allocator::secrets::{Secret, SecretSource};
use fleet_allocator::types::{AllocateRequest, CallContext, MatchmakingResults};

/// Build the call context used across the integration tests
pub fn test_context() -> CallContext {
    CallContext {
        project_id: "project-1".to_string(),
        environment_id: "env-1".to_string(),
        environment_name: "production".to_string(),
        service_token: "service-token".to_string(),
    }
}

/// Build an allocate request with optional match properties
pub fn allocate_request(
    match_id: &str,
    properties: Vec<(&str, serde_json::Value)>,
) -> AllocateRequest {
    AllocateRequest {
        match_id: match_id.to_string(),
        matchmaking_results: MatchmakingResults {
            pool_id: "poolId".to_string(),
            pool_name: "poolName".to_string(),
            queue_name: "queueName".to_string(),
            match_properties: properties
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        },
    }
}

/// Secret source that resolves every name to a fixed value
pub struct StaticSecretSource {
    value: String,
}

impl StaticSecretSource {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn get_secret(
        &self,
        _ctx: &CallContext,
        _name: &str,
    ) -> Result<Secret, AllocatorError> {
        Ok(Secret::new(self.value.clone()))
    }
}

/// Secret source that fails every lookup
pub struct FailingSecretSource;

#[async_trait]
impl SecretSource for FailingSecretSource {
    async fn get_secret(
        &self,
        _ctx: &CallContext,
        name: &str,
    ) -> Result<Secret, AllocatorError> {
        Err(AllocatorError::Configuration {
            message: format!("Secret '{}' is not set", name),
        })
    }
}
