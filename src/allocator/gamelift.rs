//! AWS GameLift backend adapter
//!
//! Allocation is a game session placement on a configured queue, tracked by a
//! placement id until fulfilled. The placement id is the caller's match id,
//! so a duplicate submission resolves to the same placement instead of
//! creating a second one.
//!
//! The maximum player session count is resolved from the config store at
//! allocation time, keyed by queue name; a failed lookup degrades to the
//! configured default and never fails the allocation.

use crate::allocator::ServerAllocator;
use crate::config::GameLiftSettings;
use crate::error::AllocatorError;
use crate::remote_config::ConfigSource;
use crate::secrets::SecretSource;
use crate::types::{
    AllocateRequest, AllocateResponse, AllocationData, Assignment, CallContext, PollRequest,
    PollResponse,
};
use crate::utils::unix_timestamp_ms;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

/// Secret names expected in the secret source
pub const AWS_ACCESS_KEY_ID_SECRET: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY_SECRET: &str = "AWS_SECRET_ACCESS_KEY";

/// Config store namespace for per-queue overrides
const CONFIG_NAMESPACE: &str = "gamelift";

const ALLOCATE_FRIENDLY_ERROR: &str = "Failed to start the game session placement.";
const POLL_FRIENDLY_ERROR: &str = "Failed to poll the game session placement.";

/// Request to start a game session placement
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartPlacementRequest {
    pub placement_id: String,
    pub game_session_queue_name: String,
    pub maximum_player_session_count: u32,
    pub game_session_data: String,
}

/// A game session placement as reported by GameLift
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameSessionPlacement {
    #[serde(default)]
    pub placement_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// AWS credentials resolved from the secret source
#[derive(Clone)]
pub struct GameLiftCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for GameLiftCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLiftCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Client for the GameLift placement API
#[async_trait]
pub trait GameLiftApi: Send + Sync {
    async fn start_game_session_placement(
        &self,
        request: &StartPlacementRequest,
    ) -> Result<GameSessionPlacement, AllocatorError>;

    async fn describe_game_session_placement(
        &self,
        placement_id: &str,
    ) -> Result<GameSessionPlacement, AllocatorError>;
}

/// Factory constructing a region-scoped GameLift client
///
/// The concrete client wraps the embedding host's AWS SDK; this crate only
/// depends on the trait.
pub trait GameLiftClientFactory: Send + Sync {
    fn create(
        &self,
        credentials: GameLiftCredentials,
        region: &str,
    ) -> Result<Arc<dyn GameLiftApi>, AllocatorError>;
}

/// Adapter driving GameLift game session placements
pub struct GameLiftAllocator {
    secrets: Arc<dyn SecretSource>,
    config_source: Arc<dyn ConfigSource>,
    factory: Arc<dyn GameLiftClientFactory>,
    settings: GameLiftSettings,
}

impl GameLiftAllocator {
    pub fn new(
        secrets: Arc<dyn SecretSource>,
        config_source: Arc<dyn ConfigSource>,
        factory: Arc<dyn GameLiftClientFactory>,
        settings: GameLiftSettings,
    ) -> Self {
        Self {
            secrets,
            config_source,
            factory,
            settings,
        }
    }

    /// Resolve credentials and build a region-scoped client
    async fn client(
        &self,
        ctx: &CallContext,
        region: &str,
    ) -> Result<Arc<dyn GameLiftApi>, AllocatorError> {
        let access_key_id = self.secrets.get_secret(ctx, AWS_ACCESS_KEY_ID_SECRET).await?;
        let secret_access_key = self
            .secrets
            .get_secret(ctx, AWS_SECRET_ACCESS_KEY_SECRET)
            .await?;

        self.factory.create(
            GameLiftCredentials {
                access_key_id: access_key_id.value,
                secret_access_key: secret_access_key.value,
            },
            region,
        )
    }

    /// Resolve the maximum player session count for this queue
    ///
    /// Best-effort: any lookup or parse failure degrades to the configured
    /// default.
    async fn resolve_max_player_session_count(&self, ctx: &CallContext) -> u32 {
        let default = self.settings.default_max_player_session_count;

        match self
            .config_source
            .get_value(ctx, CONFIG_NAMESPACE, &self.settings.queue_name)
            .await
        {
            Ok(value) => match value.parse::<u32>() {
                Ok(count) if count > 0 => count,
                _ => {
                    warn!(
                        "Config override '{}' for queue '{}' is not a valid player count, using default {}",
                        value, self.settings.queue_name, default
                    );
                    default
                }
            },
            Err(e) => {
                warn!(
                    "Could not resolve max player session count for queue '{}', using default {}: {}",
                    self.settings.queue_name, default, e
                );
                default
            }
        }
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

        let client = self.client(ctx, &region).await?;
        let max_player_session_count = self.resolve_max_player_session_count(ctx).await;

        let game_session_data = serde_json::to_string(&request.matchmaking_results)
            .map_err(|e| AllocatorError::Internal {
                message: format!("Failed to serialize matchmaking results: {}", e),
            })?;

        let placement = client
            .start_game_session_placement(&StartPlacementRequest {
                placement_id: request.match_id.clone(),
                game_session_queue_name: self.settings.queue_name.clone(),
                maximum_player_session_count: max_player_session_count,
                game_session_data,
            })
            .await?;

        if placement.placement_id.is_empty() {
            return Err(AllocatorError::validation(
                "placementId",
                "placement response carries no placement id",
            ));
        }

        Ok(AllocationData::GameLift {
            placement_id: placement.placement_id,
            aws_region: region,
            start_time: unix_timestamp_ms(),
            match_id: request.match_id.clone(),
        })
    }

    async fn try_poll(
        &self,
        ctx: &CallContext,
        placement_id: &str,
        region: &str,
    ) -> Result<PollResponse, AllocatorError> {
        let client = self.client(ctx, region).await?;
        let placement = client.describe_game_session_placement(placement_id).await?;
        Ok(map_placement_status(&placement))
    }
}

/// Map a placement onto the canonical poll outcome
///
/// Total over the placement status vocabulary: every value GameLift can
/// return resolves to exactly one canonical status, and anything
/// unrecognized is an error rather than an indefinite Pending.
fn map_placement_status(placement: &GameSessionPlacement) -> PollResponse {
    match placement.status.as_str() {
        "PENDING" => PollResponse::pending(),
        "FULFILLED" => {
            let ip = placement
                .ip_address
                .clone()
                .filter(|address| !address.is_empty());

            match (ip, placement.port) {
                (Some(ip), Some(port)) => PollResponse::allocated(Assignment::ip_port(ip, port)),
                (None, _) => {
                    error!(
                        "Placement '{}' was fulfilled without an IP address",
                        placement.placement_id
                    );
                    PollResponse::error(
                        "Game session placement was fulfilled without a valid IP address",
                    )
                }
                (_, None) => {
                    error!(
                        "Placement '{}' was fulfilled without a port",
                        placement.placement_id
                    );
                    PollResponse::error("Game session placement was fulfilled without a valid port")
                }
            }
        }
        "TIMED_OUT" => PollResponse::error("Game session placement timed out"),
        "CANCELLED" => PollResponse::error("Game session placement was cancelled"),
        "FAILED" => PollResponse::error("Game session placement failed"),
        other => {
            error!(
                "Placement '{}': {}",
                placement.placement_id,
                AllocatorError::UnknownStatus {
                    raw: other.to_string()
                }
            );
            PollResponse::error(format!("Unknown placement status: {}", other))
        }
    }
}

#[async_trait]
impl ServerAllocator for GameLiftAllocator {
    async fn allocate(&self, ctx: &CallContext, request: AllocateRequest) -> AllocateResponse {
        match self.try_allocate(ctx, &request).await {
            Ok(allocation_data) => AllocateResponse::created(allocation_data),
            Err(e) => {
                error!(
                    "Error starting game session placement for match '{}': {}",
                    request.match_id, e
                );
                AllocateResponse::error(ALLOCATE_FRIENDLY_ERROR)
            }
        }
    }

    async fn poll(&self, ctx: &CallContext, request: PollRequest) -> PollResponse {
        let (placement_id, region) = match &request.allocation_data {
            AllocationData::GameLift {
                placement_id,
                aws_region,
                ..
            } => (placement_id.clone(), aws_region.clone()),
            other => {
                return PollResponse::error(format!(
                    "Allocation data belongs to the '{}' backend, not gamelift",
                    other.backend()
                ))
            }
        };

        match self.try_poll(ctx, &placement_id, &region).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    "Failed to describe game session placement '{}': {}",
                    placement_id, e
                );
                PollResponse::error(POLL_FRIENDLY_ERROR)
            }
        }
    }
}
