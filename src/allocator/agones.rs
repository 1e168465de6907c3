//! Agones backend adapter
//!
//! Agones allocates synchronously: the allocator service either hands back a
//! ready game server or fails. The two-phase contract still holds by storing
//! the final assignment in the continuation data at allocate time; poll is a
//! pure, no-I/O echo of that stored assignment.
//!
//! Unlike the other backends, error messages here include the underlying
//! error text rather than a generic message.

use crate::allocator::ServerAllocator;
use crate::error::AllocatorError;
use crate::types::{
    AllocateRequest, AllocateResponse, AllocationData, Assignment, CallContext, PollRequest,
    PollResponse,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Allocation request posted to the Agones allocator service
///
/// Selectors are configured on the allocator service side; the request body
/// itself carries none.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgonesAllocationRequest {}

/// Address entry in an Agones allocation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgonesAddress {
    pub address: String,
}

/// Port entry in an Agones allocation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgonesPort {
    pub port: u16,
}

/// Allocation response from the Agones allocator service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgonesAllocation {
    #[serde(default)]
    pub game_server_name: Option<String>,
    #[serde(default)]
    pub addresses: Vec<AgonesAddress>,
    #[serde(default)]
    pub ports: Vec<AgonesPort>,
}

/// Client for the Agones allocator service
#[async_trait]
pub trait AgonesApi: Send + Sync {
    /// Post a game server allocation
    async fn create_allocation(
        &self,
        request: &AgonesAllocationRequest,
    ) -> Result<AgonesAllocation, AllocatorError>;
}

/// Adapter driving the Agones allocator service
pub struct AgonesAllocator {
    api: Arc<dyn AgonesApi>,
}

impl AgonesAllocator {
    pub fn new(api: Arc<dyn AgonesApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ServerAllocator for AgonesAllocator {
    async fn allocate(&self, _ctx: &CallContext, request: AllocateRequest) -> AllocateResponse {
        let allocation = match self
            .api
            .create_allocation(&AgonesAllocationRequest::default())
            .await
        {
            Ok(allocation) => allocation,
            Err(e) => {
                error!("Error creating Agones allocation for match '{}': {}", request.match_id, e);
                return AllocateResponse::error(format!("Error creating Agones allocation: {}", e));
            }
        };

        let ip = allocation
            .addresses
            .first()
            .map(|a| a.address.clone())
            .filter(|address| !address.is_empty());
        let port = allocation.ports.first().map(|p| p.port);

        match (ip, port) {
            (Some(ip), Some(port)) => {
                AllocateResponse::created(AllocationData::Agones { ip, port })
            }
            _ => {
                error!("Allocation did not return a valid IP or Port");
                AllocateResponse::error("Allocation did not return a valid IP or Port")
            }
        }
    }

    async fn poll(&self, _ctx: &CallContext, request: PollRequest) -> PollResponse {
        match request.allocation_data {
            AllocationData::Agones { ip, port } => {
                PollResponse::allocated(Assignment::ip_port(ip, port))
            }
            other => PollResponse::error(format!(
                "Allocation data belongs to the '{}' backend, not agones",
                other.backend()
            )),
        }
    }
}
