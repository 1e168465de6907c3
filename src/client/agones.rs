//! HTTP client for the Agones allocator service

use crate::allocator::agones::{AgonesAllocation, AgonesAllocationRequest, AgonesApi};
use crate::config::AgonesSettings;
use crate::error::AllocatorError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Agones allocator service client
pub struct HttpAgonesApi {
    base_url: String,
    client: Client,
}

impl HttpAgonesApi {
    pub fn new(settings: &AgonesSettings) -> Self {
        Self {
            base_url: settings.allocator_base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl AgonesApi for HttpAgonesApi {
    async fn create_allocation(
        &self,
        request: &AgonesAllocationRequest,
    ) -> Result<AgonesAllocation, AllocatorError> {
        let url = format!("{}/gameserverallocation", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(AllocatorError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Agones allocator returned {}: {}", status, body);
            return Err(AllocatorError::Transport {
                message: format!("Agones allocator returned {}", status),
            });
        }

        response
            .json::<AgonesAllocation>()
            .await
            .map_err(AllocatorError::transport)
    }
}
