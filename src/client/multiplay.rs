//! HTTP client for the Unity Multiplay allocations API

use crate::allocator::multiplay::{
    MultiplayAllocationCreated, MultiplayAllocationRequest, MultiplayAllocationStatus,
    MultiplayApi, MultiplayApiFactory,
};
use crate::config::MultiplaySettings;
use crate::error::AllocatorError;
use crate::types::CallContext;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Factory producing bearer-token Multiplay clients per call
pub struct HttpMultiplayApiFactory {
    host: String,
}

impl HttpMultiplayApiFactory {
    pub fn new(settings: &MultiplaySettings) -> Self {
        Self {
            host: settings.host.clone(),
        }
    }
}

impl MultiplayApiFactory for HttpMultiplayApiFactory {
    fn create(&self, service_token: &str) -> Arc<dyn MultiplayApi> {
        Arc::new(HttpMultiplayApi {
            host: self.host.clone(),
            service_token: service_token.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        })
    }
}

/// Multiplay allocations API client scoped to one service token
pub struct HttpMultiplayApi {
    host: String,
    service_token: String,
    client: Client,
}

impl HttpMultiplayApi {
    fn allocations_url(&self, ctx: &CallContext, fleet_id: &str) -> String {
        format!(
            "https://{}/v1/allocations/projects/{}/environments/{}/fleets/{}/allocations",
            self.host, ctx.project_id, ctx.environment_id, fleet_id
        )
    }
}

#[async_trait]
impl MultiplayApi for HttpMultiplayApi {
    async fn create_allocation(
        &self,
        ctx: &CallContext,
        fleet_id: &str,
        request: &MultiplayAllocationRequest,
    ) -> Result<MultiplayAllocationCreated, AllocatorError> {
        let url = self.allocations_url(ctx, fleet_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_token)
            .json(request)
            .send()
            .await
            .map_err(AllocatorError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Multiplay allocation create returned {}: {}", status, body);
            return Err(AllocatorError::Transport {
                message: format!("Multiplay API returned {}", status),
            });
        }

        response
            .json::<MultiplayAllocationCreated>()
            .await
            .map_err(AllocatorError::transport)
    }

    async fn get_allocation(
        &self,
        ctx: &CallContext,
        fleet_id: &str,
        allocation_id: &str,
    ) -> Result<MultiplayAllocationStatus, AllocatorError> {
        let url = format!("{}/{}", self.allocations_url(ctx, fleet_id), allocation_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.service_token)
            .send()
            .await
            .map_err(AllocatorError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Multiplay allocation fetch returned {}: {}", status, body);
            return Err(AllocatorError::Transport {
                message: format!("Multiplay API returned {}", status),
            });
        }

        response
            .json::<MultiplayAllocationStatus>()
            .await
            .map_err(AllocatorError::transport)
    }
}
