//! Unity Multiplay backend adapter
//!
//! Allocation posts a fleet allocation and polls it by allocation id. The
//! allocation id is the caller's match id, so a duplicate submission resolves
//! to the same allocation instead of creating a second one. The API client is
//! created per call from the caller-scoped service token.

use crate::allocator::ServerAllocator;
use crate::config::MultiplaySettings;
use crate::error::AllocatorError;
use crate::types::{
    AllocateRequest, AllocateResponse, AllocationData, Assignment, CallContext, PollRequest,
    PollResponse,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

const ALLOCATE_FRIENDLY_ERROR: &str = "Failed to create the Multiplay allocation.";
const POLL_FRIENDLY_ERROR: &str = "Failed to poll the Multiplay allocation.";

/// Request body for creating a fleet allocation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplayAllocationRequest {
    pub allocation_id: String,
    pub build_configuration_id: i64,
    pub region_id: String,
    /// Serialized matchmaking results, forwarded to the game server
    pub payload: String,
}

/// Response body from creating a fleet allocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplayAllocationCreated {
    #[serde(default)]
    pub allocation_id: String,
}

/// A fleet allocation as reported by the Multiplay API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplayAllocationStatus {
    #[serde(default)]
    pub allocation_id: String,
    /// Set (non-empty) once the allocation has been fulfilled
    #[serde(default)]
    pub fulfilled: Option<String>,
    /// Whether the fleet tracks server readiness separately from fulfilment
    #[serde(default)]
    pub readiness: bool,
    /// Set (non-empty) once a readiness-tracked server reports ready
    #[serde(default)]
    pub ready: Option<String>,
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub game_port: u16,
}

/// Client for the Multiplay allocations API
#[async_trait]
pub trait MultiplayApi: Send + Sync {
    /// Create a fleet allocation
    async fn create_allocation(
        &self,
        ctx: &CallContext,
        fleet_id: &str,
        request: &MultiplayAllocationRequest,
    ) -> Result<MultiplayAllocationCreated, AllocatorError>;

    /// Fetch a fleet allocation by id
    async fn get_allocation(
        &self,
        ctx: &CallContext,
        fleet_id: &str,
        allocation_id: &str,
    ) -> Result<MultiplayAllocationStatus, AllocatorError>;
}

/// Factory constructing a token-authenticated Multiplay client
pub trait MultiplayApiFactory: Send + Sync {
    fn create(&self, service_token: &str) -> Arc<dyn MultiplayApi>;
}

/// Adapter driving Multiplay fleet allocations
pub struct MultiplayAllocator {
    factory: Arc<dyn MultiplayApiFactory>,
    settings: MultiplaySettings,
}

impl MultiplayAllocator {
    pub fn new(factory: Arc<dyn MultiplayApiFactory>, settings: MultiplaySettings) -> Self {
        Self { factory, settings }
    }

    async fn try_allocate(
        &self,
        ctx: &CallContext,
        request: &AllocateRequest,
    ) -> Result<AllocationData, AllocatorError> {
        let region = request
            .matchmaking_results
            .region_hint()
            .unwrap_or_else(|| self.settings.default_region.clone());

        let payload = serde_json::to_string(&request.matchmaking_results).map_err(|e| {
            AllocatorError::Internal {
                message: format!("Failed to serialize matchmaking results: {}", e),
            }
        })?;

        let api = self.factory.create(&ctx.service_token);
        let created = api
            .create_allocation(
                ctx,
                &self.settings.fleet_id,
                &MultiplayAllocationRequest {
                    allocation_id: request.match_id.clone(),
                    build_configuration_id: self.settings.build_configuration_id,
                    region_id: region.clone(),
                    payload,
                },
            )
            .await?;

        let allocation_id = if created.allocation_id.is_empty() {
            request.match_id.clone()
        } else {
            created.allocation_id
        };

        Ok(AllocationData::Multiplay {
            allocation_id,
            region,
        })
    }
}

/// Map a fleet allocation onto the canonical poll outcome
///
/// The assignment is trusted once the allocation is fulfilled, the readiness
/// gate passes (a readiness-tracked allocation also needs a ready marker),
/// and the connection fields are populated. Everything short of that is
/// Pending; transport failures are handled by the caller.
fn map_allocation_status(allocation: &MultiplayAllocationStatus) -> PollResponse {
    let fulfilled = allocation
        .fulfilled
        .as_deref()
        .is_some_and(|value| !value.is_empty());
    let ready_gate = !allocation.readiness
        || allocation
            .ready
            .as_deref()
            .is_some_and(|value| !value.is_empty());

    if fulfilled && ready_gate {
        let ip = allocation.ipv4.as_deref().filter(|ip| !ip.is_empty());
        if let Some(ip) = ip {
            if allocation.game_port != 0 {
                return PollResponse::allocated(Assignment::ip_port(ip, allocation.game_port));
            }
        }
    }

    PollResponse::pending()
}

#[async_trait]
impl ServerAllocator for MultiplayAllocator {
    async fn allocate(&self, ctx: &CallContext, request: AllocateRequest) -> AllocateResponse {
        match self.try_allocate(ctx, &request).await {
            Ok(allocation_data) => AllocateResponse::created(allocation_data),
            Err(e) => {
                error!(
                    "Error allocating Multiplay server for match '{}': {}",
                    request.match_id, e
                );
                AllocateResponse::error(ALLOCATE_FRIENDLY_ERROR)
            }
        }
    }

    async fn poll(&self, ctx: &CallContext, request: PollRequest) -> PollResponse {
        let allocation_id = match &request.allocation_data {
            AllocationData::Multiplay { allocation_id, .. } => allocation_id.clone(),
            other => {
                return PollResponse::error(format!(
                    "Allocation data belongs to the '{}' backend, not multiplay",
                    other.backend()
                ))
            }
        };

        let api = self.factory.create(&ctx.service_token);
        match api
            .get_allocation(ctx, &self.settings.fleet_id, &allocation_id)
            .await
        {
            Ok(allocation) => map_allocation_status(&allocation),
            Err(e) => {
                error!("Error polling Multiplay allocation '{}': {}", allocation_id, e);
                PollResponse::error(POLL_FRIENDLY_ERROR)
            }
        }
    }
}
