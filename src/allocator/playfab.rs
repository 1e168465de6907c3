//! Azure PlayFab backend adapter
//!
//! Every call re-authenticates from scratch: the developer secret key comes
//! from the secret source, an entity token is minted from it, and only then
//! is the session-scoped multiplayer API constructed. Responses are
//! validated strictly at every stage; a malformed payload is an error, never
//! a silently wrong assignment.
//!
//! Caller-facing messages are fixed and generic; the one exception is an
//! unrecognized server state, whose raw value is embedded so the poll loop
//! can never hang on an unknown vocabulary.

use crate::allocator::ServerAllocator;
use crate::config::PlayFabSettings;
use crate::error::AllocatorError;
use crate::secrets::SecretSource;
use crate::types::{
    AllocateRequest, AllocateResponse, AllocationData, Assignment, CallContext, PollRequest,
    PollResponse,
};
use crate::utils::unix_timestamp_ms;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Secret name expected in the secret source
pub const PLAYFAB_SECRET_KEY_SECRET: &str = "PLAYFAB_SECRET_KEY";

const ALLOCATE_FRIENDLY_ERROR: &str = "An error occurred when allocating.";
const POLL_FRIENDLY_ERROR: &str = "An error occurred when polling the server status.";
const SERVER_TERMINATING_ERROR: &str = "The server is terminating.";

/// Title-scoped API settings carrying the developer secret key
#[derive(Clone)]
pub struct PlayFabApiSettings {
    pub title_id: String,
    pub developer_secret_key: String,
}

impl std::fmt::Debug for PlayFabApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayFabApiSettings")
            .field("title_id", &self.title_id)
            .field("developer_secret_key", &"<redacted>")
            .finish()
    }
}

/// API-level error detail reported inside an otherwise successful response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayFabError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error_message: String,
}

/// Result wrapper used by the PlayFab APIs: either a payload or an error
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayFabApiResult<T> {
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default = "Option::default")]
    pub error: Option<PlayFabError>,
}

/// Entity identity attached to an entity token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayFabEntity {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "Type")]
    pub entity_type: String,
}

/// Response to a GetEntityToken call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityTokenResponse {
    #[serde(default)]
    pub entity_token: String,
    #[serde(default)]
    pub entity: Option<PlayFabEntity>,
}

/// Validated authentication material for the multiplayer API
#[derive(Debug, Clone)]
pub struct PlayFabAuthenticationContext {
    pub entity_id: String,
    pub entity_token: String,
    pub entity_type: String,
}

/// Request for a multiplayer server
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestMultiplayerServerRequest {
    pub build_id: String,
    pub preferred_regions: Vec<String>,
    pub session_id: String,
}

/// Response to a multiplayer server request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestMultiplayerServerResponse {
    #[serde(default)]
    pub session_id: String,
}

/// Port entry in multiplayer server details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayFabPort {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub num: u16,
}

/// Multiplayer server details returned by a poll
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MultiplayerServerDetails {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, rename = "IPV4Address")]
    pub ipv4_address: String,
    #[serde(default)]
    pub ports: Vec<PlayFabPort>,
}

/// The server lifecycle states PlayFab reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GameServerState {
    Initializing,
    StandingBy,
    Active,
    Terminating,
}

impl std::str::FromStr for GameServerState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Initializing" => Ok(GameServerState::Initializing),
            "StandingBy" => Ok(GameServerState::StandingBy),
            "Active" => Ok(GameServerState::Active),
            "Terminating" => Ok(GameServerState::Terminating),
            _ => Err(()),
        }
    }
}

/// Client for the PlayFab authentication API
#[async_trait]
pub trait PlayFabAuthApi: Send + Sync {
    async fn get_entity_token(
        &self,
        settings: &PlayFabApiSettings,
    ) -> Result<PlayFabApiResult<EntityTokenResponse>, AllocatorError>;
}

/// Client for the PlayFab multiplayer server API
#[async_trait]
pub trait PlayFabMultiplayerApi: Send + Sync {
    async fn request_multiplayer_server(
        &self,
        request: &RequestMultiplayerServerRequest,
    ) -> Result<PlayFabApiResult<RequestMultiplayerServerResponse>, AllocatorError>;

    async fn get_multiplayer_server_details(
        &self,
        session_id: &str,
    ) -> Result<PlayFabApiResult<MultiplayerServerDetails>, AllocatorError>;
}

/// Factory constructing an entity-token-scoped multiplayer API client
pub trait PlayFabClientFactory: Send + Sync {
    fn create_multiplayer_api(
        &self,
        settings: &PlayFabApiSettings,
        auth: &PlayFabAuthenticationContext,
    ) -> Arc<dyn PlayFabMultiplayerApi>;
}

/// Validate an entity token result and extract the authentication context
fn validate_entity_token(
    result: &PlayFabApiResult<EntityTokenResponse>,
) -> Result<PlayFabAuthenticationContext, AllocatorError> {
    if let Some(error) = &result.error {
        return Err(AllocatorError::Configuration {
            message: format!(
                "Entity token request failed: {} ({})",
                error.error_message, error.code
            ),
        });
    }

    let response = result.result.as_ref().ok_or_else(|| {
        AllocatorError::validation("result", "entity token response carries no result")
    })?;

    let entity = response.entity.as_ref().ok_or_else(|| {
        AllocatorError::validation("entity", "entity token response carries no entity")
    })?;

    if response.entity_token.is_empty() || entity.id.is_empty() || entity.entity_type.is_empty() {
        return Err(AllocatorError::validation(
            "entityToken",
            "entity token is malformed",
        ));
    }

    Ok(PlayFabAuthenticationContext {
        entity_id: entity.id.clone(),
        entity_token: response.entity_token.clone(),
        entity_type: entity.entity_type.clone(),
    })
}

/// Validate a multiplayer server allocation result
fn validate_allocation_result(
    result: &PlayFabApiResult<RequestMultiplayerServerResponse>,
) -> Result<RequestMultiplayerServerResponse, AllocatorError> {
    if let Some(error) = &result.error {
        return Err(AllocatorError::ProviderTerminal {
            message: format!(
                "Multiplayer server request failed: {} ({})",
                error.error_message, error.code
            ),
        });
    }

    match result.result.as_ref() {
        Some(response) if !response.session_id.is_empty() => Ok(response.clone()),
        Some(_) => Err(AllocatorError::validation(
            "sessionId",
            "allocation response carries no session id",
        )),
        None => Err(AllocatorError::validation(
            "result",
            "allocation response carries no result",
        )),
    }
}

/// Map multiplayer server details onto the canonical poll outcome
///
/// Total over the server state vocabulary; an unparseable state embeds the
/// raw value in the error message rather than pending forever.
fn map_server_state(details: &MultiplayerServerDetails) -> PollResponse {
    let state = match details.state.parse::<GameServerState>() {
        Ok(state) => state,
        Err(()) => {
            error!(
                "Session '{}': {}",
                details.session_id,
                AllocatorError::UnknownStatus {
                    raw: details.state.clone()
                }
            );
            return PollResponse::error(format!(
                "An error occurred when parsing the server state. Server state: {}",
                details.state
            ));
        }
    };

    match state {
        GameServerState::Initializing | GameServerState::StandingBy => PollResponse::pending(),
        GameServerState::Active => {
            if details.ipv4_address.is_empty() || details.ports.is_empty() {
                error!(
                    "Multiplayer server details for session '{}' are malformed",
                    details.session_id
                );
                return PollResponse::error(POLL_FRIENDLY_ERROR);
            }
            PollResponse::allocated(Assignment::ip_port(
                details.ipv4_address.clone(),
                details.ports[0].num,
            ))
        }
        GameServerState::Terminating => PollResponse::error(SERVER_TERMINATING_ERROR),
    }
}

/// Adapter driving PlayFab multiplayer servers
pub struct PlayFabAllocator {
    secrets: Arc<dyn SecretSource>,
    auth_api: Arc<dyn PlayFabAuthApi>,
    factory: Arc<dyn PlayFabClientFactory>,
    settings: PlayFabSettings,
}

impl PlayFabAllocator {
    pub fn new(
        secrets: Arc<dyn SecretSource>,
        auth_api: Arc<dyn PlayFabAuthApi>,
        factory: Arc<dyn PlayFabClientFactory>,
        settings: PlayFabSettings,
    ) -> Self {
        Self {
            secrets,
            auth_api,
            factory,
            settings,
        }
    }

    /// Resolve the secret key and mint a validated entity token
    async fn authenticate(
        &self,
        ctx: &CallContext,
    ) -> Result<(PlayFabApiSettings, PlayFabAuthenticationContext), AllocatorError> {
        let secret = self
            .secrets
            .get_secret(ctx, PLAYFAB_SECRET_KEY_SECRET)
            .await
            .map_err(|e| {
                error!(
                    "An error occurred when retrieving secret for key '{}': {}",
                    PLAYFAB_SECRET_KEY_SECRET, e
                );
                e
            })?;

        let api_settings = PlayFabApiSettings {
            title_id: self.settings.title_id.clone(),
            developer_secret_key: secret.value,
        };

        let token_result = self.auth_api.get_entity_token(&api_settings).await?;
        let auth = validate_entity_token(&token_result)?;

        Ok((api_settings, auth))
    }

    async fn try_allocate(
        &self,
        ctx: &CallContext,
        request: &AllocateRequest,
    ) -> Result<AllocationData, AllocatorError> {
        let (api_settings, auth) = self.authenticate(ctx).await?;
        let api = self.factory.create_multiplayer_api(&api_settings, &auth);

        let region = request
            .matchmaking_results
            .region_hint()
            .unwrap_or_else(|| self.settings.default_region.clone());
        if region.trim().is_empty() {
            return Err(AllocatorError::validation(
                "region",
                "the region must not be empty or whitespace",
            ));
        }

        let result = api
            .request_multiplayer_server(&RequestMultiplayerServerRequest {
                build_id: self.settings.build_id.clone(),
                preferred_regions: vec![region.clone()],
                session_id: request.match_id.clone(),
            })
            .await?;

        let response = validate_allocation_result(&result)?;

        Ok(AllocationData::PlayFab {
            session_id: response.session_id,
            playfab_region: region,
            start_time: unix_timestamp_ms(),
            match_id: request.match_id.clone(),
        })
    }

    async fn try_poll(
        &self,
        ctx: &CallContext,
        session_id: &str,
    ) -> Result<PollResponse, AllocatorError> {
        let (api_settings, auth) = self.authenticate(ctx).await?;
        let api = self.factory.create_multiplayer_api(&api_settings, &auth);

        let result = api.get_multiplayer_server_details(session_id).await?;

        if let Some(error) = &result.error {
            return Err(AllocatorError::Transport {
                message: format!(
                    "Multiplayer server details request failed: {} ({})",
                    error.error_message, error.code
                ),
            });
        }

        let details = result.result.as_ref().ok_or_else(|| {
            AllocatorError::validation("result", "server details response carries no result")
        })?;

        Ok(map_server_state(details))
    }
}

#[async_trait]
impl ServerAllocator for PlayFabAllocator {
    async fn allocate(&self, ctx: &CallContext, request: AllocateRequest) -> AllocateResponse {
        match self.try_allocate(ctx, &request).await {
            Ok(allocation_data) => AllocateResponse::created(allocation_data),
            Err(e) => {
                error!(
                    "An error occurred when allocating for match '{}': {}",
                    request.match_id, e
                );
                AllocateResponse::error(ALLOCATE_FRIENDLY_ERROR)
            }
        }
    }

    async fn poll(&self, ctx: &CallContext, request: PollRequest) -> PollResponse {
        let session_id = match &request.allocation_data {
            AllocationData::PlayFab { session_id, .. } => session_id.clone(),
            other => {
                return PollResponse::error(format!(
                    "Allocation data belongs to the '{}' backend, not playfab",
                    other.backend()
                ))
            }
        };

        match self.try_poll(ctx, &session_id).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    "An error occurred when polling the server status for session '{}': {}",
                    session_id, e
                );
                PollResponse::error(POLL_FRIENDLY_ERROR)
            }
        }
    }
}
