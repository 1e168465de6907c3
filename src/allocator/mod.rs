//! Backend adapters and allocation dispatch
//!
//! Every fleet backend implements the same two-call contract: submit an
//! allocation, then poll it to a terminal outcome. Adapters hold no state
//! between calls; everything a poll needs travels in the continuation data
//! returned by allocate.

pub mod agones;
pub mod gamelift;
pub mod multiplay;
pub mod playfab;

use crate::types::{
    AllocateRequest, AllocateResponse, BackendKind, CallContext, PollRequest, PollResponse,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub use agones::AgonesAllocator;
pub use gamelift::GameLiftAllocator;
pub use multiplay::MultiplayAllocator;
pub use playfab::PlayFabAllocator;

/// The canonical contract every backend adapter implements
///
/// Both operations are non-throwing: all failure paths resolve to a
/// well-formed response with `status = Error` and a message. Both are
/// idempotent with respect to transport retries; adapters hand the caller's
/// `match_id` to the backend as its native idempotency key wherever one
/// exists.
#[async_trait]
pub trait ServerAllocator: Send + Sync {
    /// Submit an allocation request for a match
    async fn allocate(&self, ctx: &CallContext, request: AllocateRequest) -> AllocateResponse;

    /// Poll a previously submitted allocation until it reaches a terminal
    /// outcome
    async fn poll(&self, ctx: &CallContext, request: PollRequest) -> PollResponse;
}

/// Registry of adapters keyed by backend
#[derive(Default)]
pub struct AllocatorRegistry {
    allocators: HashMap<BackendKind, Arc<dyn ServerAllocator>>,
}

impl AllocatorRegistry {
    pub fn new() -> Self {
        Self {
            allocators: HashMap::new(),
        }
    }

    /// Register an adapter for a backend, replacing any previous one
    pub fn register(&mut self, kind: BackendKind, allocator: Arc<dyn ServerAllocator>) {
        self.allocators.insert(kind, allocator);
    }

    /// Look up the adapter for a backend
    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn ServerAllocator>> {
        self.allocators.get(&kind).cloned()
    }

    /// Backends with a registered adapter
    pub fn registered(&self) -> Vec<BackendKind> {
        self.allocators.keys().copied().collect()
    }
}

/// Routes canonical calls to the right adapter
///
/// New allocations go to the configured backend. Polls are routed by the
/// continuation data's backend tag instead, so an in-flight allocation keeps
/// polling against the backend that created it even if the configured
/// backend changes between calls.
pub struct Dispatcher {
    backend: BackendKind,
    registry: AllocatorRegistry,
}

impl Dispatcher {
    pub fn new(backend: BackendKind, registry: AllocatorRegistry) -> Self {
        Self { backend, registry }
    }

    /// Backend new allocations are dispatched to
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Backends with a registered adapter
    pub fn registered_backends(&self) -> Vec<BackendKind> {
        self.registry.registered()
    }

    /// Dispatch an allocation submission to the configured backend
    pub async fn allocate(&self, ctx: &CallContext, request: AllocateRequest) -> AllocateResponse {
        info!(
            "Dispatching allocation - match: '{}', backend: {}",
            request.match_id, self.backend
        );

        match self.registry.get(self.backend) {
            Some(allocator) => allocator.allocate(ctx, request).await,
            None => {
                warn!("No allocator registered for backend {}", self.backend);
                AllocateResponse::error(format!(
                    "No allocator registered for backend '{}'",
                    self.backend
                ))
            }
        }
    }

    /// Dispatch a poll to the backend named by the continuation data
    pub async fn poll(&self, ctx: &CallContext, request: PollRequest) -> PollResponse {
        let kind = request.allocation_data.backend();

        match self.registry.get(kind) {
            Some(allocator) => allocator.poll(ctx, request).await,
            None => {
                warn!("No allocator registered for backend {}", kind);
                PollResponse::error(format!("No allocator registered for backend '{}'", kind))
            }
        }
    }
}
