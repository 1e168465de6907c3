//! Integration tests for the PlayFab adapter
//!
//! These cover the multi-stage authentication, strict result validation,
//! region handling, and the server state mapping, driving the adapter
//! through hand-rolled API doubles.

mod fixtures;

use async_trait::async_trait;
use fixtures::{allocate_request, test_context, FailingSecretSource, StaticSecretSource};
use fleet_allocator::allocator::playfab::{
    EntityTokenResponse, MultiplayerServerDetails, PlayFabApiResult, PlayFabApiSettings,
    PlayFabAuthApi, PlayFabAuthenticationContext, PlayFabClientFactory, PlayFabEntity,
    PlayFabError, PlayFabMultiplayerApi, PlayFabPort, RequestMultiplayerServerRequest,
    RequestMultiplayerServerResponse,
};
use fleet_allocator::allocator::{PlayFabAllocator, ServerAllocator};
use fleet_allocator::config::PlayFabSettings;
use fleet_allocator::error::AllocatorError;
use fleet_allocator::types::{
    AllocateStatus, AllocationData, Assignment, PollRequest, PollStatus,
};
use fleet_allocator::utils::current_timestamp;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const ALLOCATE_ERROR: &str = "An error occurred when allocating.";
const POLL_ERROR: &str = "An error occurred when polling the server status.";

struct FakeAuthApi {
    result: Option<PlayFabApiResult<EntityTokenResponse>>,
    calls: AtomicUsize,
}

impl FakeAuthApi {
    fn returning(result: PlayFabApiResult<EntityTokenResponse>) -> Self {
        Self {
            result: Some(result),
            calls: AtomicUsize::new(0),
        }
    }

    fn valid() -> Self {
        Self::returning(valid_token_result())
    }

    fn failing() -> Self {
        Self {
            result: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PlayFabAuthApi for FakeAuthApi {
    async fn get_entity_token(
        &self,
        _settings: &PlayFabApiSettings,
    ) -> Result<PlayFabApiResult<EntityTokenResponse>, AllocatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Some(result) => Ok(result.clone()),
            None => Err(AllocatorError::Transport {
                message: "authentication service unavailable".to_string(),
            }),
        }
    }
}

struct FakeMultiplayerApi {
    request_response: Option<PlayFabApiResult<RequestMultiplayerServerResponse>>,
    details_response: Option<PlayFabApiResult<MultiplayerServerDetails>>,
    requests: Mutex<Vec<RequestMultiplayerServerRequest>>,
    detail_requests: Mutex<Vec<String>>,
}

impl FakeMultiplayerApi {
    fn new(
        request_response: Option<PlayFabApiResult<RequestMultiplayerServerResponse>>,
        details_response: Option<PlayFabApiResult<MultiplayerServerDetails>>,
    ) -> Self {
        Self {
            request_response,
            details_response,
            requests: Mutex::new(Vec::new()),
            detail_requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PlayFabMultiplayerApi for FakeMultiplayerApi {
    async fn request_multiplayer_server(
        &self,
        request: &RequestMultiplayerServerRequest,
    ) -> Result<PlayFabApiResult<RequestMultiplayerServerResponse>, AllocatorError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.request_response {
            Some(result) => Ok(result.clone()),
            None => Err(AllocatorError::Transport {
                message: "multiplayer service unavailable".to_string(),
            }),
        }
    }

    async fn get_multiplayer_server_details(
        &self,
        session_id: &str,
    ) -> Result<PlayFabApiResult<MultiplayerServerDetails>, AllocatorError> {
        self.detail_requests
            .lock()
            .unwrap()
            .push(session_id.to_string());
        match &self.details_response {
            Some(result) => Ok(result.clone()),
            None => Err(AllocatorError::Transport {
                message: "multiplayer service unavailable".to_string(),
            }),
        }
    }
}

struct FakeFactory {
    api: Arc<FakeMultiplayerApi>,
    created: AtomicUsize,
}

impl FakeFactory {
    fn new(api: Arc<FakeMultiplayerApi>) -> Self {
        Self {
            api,
            created: AtomicUsize::new(0),
        }
    }
}

impl PlayFabClientFactory for FakeFactory {
    fn create_multiplayer_api(
        &self,
        _settings: &PlayFabApiSettings,
        _auth: &PlayFabAuthenticationContext,
    ) -> Arc<dyn PlayFabMultiplayerApi> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.api.clone()
    }
}

fn valid_token_result() -> PlayFabApiResult<EntityTokenResponse> {
    PlayFabApiResult {
        result: Some(EntityTokenResponse {
            entity_token: "entity-token".to_string(),
            entity: Some(PlayFabEntity {
                id: "entity-1".to_string(),
                entity_type: "title".to_string(),
            }),
        }),
        error: None,
    }
}

fn created_session(session_id: &str) -> PlayFabApiResult<RequestMultiplayerServerResponse> {
    PlayFabApiResult {
        result: Some(RequestMultiplayerServerResponse {
            session_id: session_id.to_string(),
        }),
        error: None,
    }
}

fn server_details(state: &str, ip: &str, ports: Vec<u16>) -> PlayFabApiResult<MultiplayerServerDetails> {
    PlayFabApiResult {
        result: Some(MultiplayerServerDetails {
            session_id: "1234".to_string(),
            state: state.to_string(),
            ipv4_address: ip.to_string(),
            ports: ports
                .into_iter()
                .map(|num| PlayFabPort {
                    name: "game".to_string(),
                    num,
                })
                .collect(),
        }),
        error: None,
    }
}

fn settings() -> PlayFabSettings {
    PlayFabSettings {
        title_id: "MY_TITLE_ID".to_string(),
        build_id: "MY_BUILD_ID".to_string(),
        default_region: "EastUs".to_string(),
    }
}

fn allocator_with(
    auth: FakeAuthApi,
    factory: Arc<FakeFactory>,
) -> PlayFabAllocator {
    PlayFabAllocator::new(
        Arc::new(StaticSecretSource::with_value("secret")),
        Arc::new(auth),
        factory,
        settings(),
    )
}

fn playfab_allocation_data(session_id: &str) -> AllocationData {
    AllocationData::PlayFab {
        session_id: session_id.to_string(),
        playfab_region: "EastUs".to_string(),
        start_time: 0,
        match_id: "1234".to_string(),
    }
}

#[tokio::test]
async fn test_allocate_error_when_secret_is_not_found() {
    let api = Arc::new(FakeMultiplayerApi::new(None, None));
    let factory = Arc::new(FakeFactory::new(api.clone()));
    let auth = Arc::new(FakeAuthApi::valid());

    let allocator = PlayFabAllocator::new(
        Arc::new(FailingSecretSource),
        auth.clone(),
        factory.clone(),
        settings(),
    );

    let allocation = allocator
        .allocate(&test_context(), allocate_request("1234", vec![]))
        .await;

    assert_eq!(allocation.status, AllocateStatus::Error);
    assert_eq!(allocation.message.as_deref(), Some(ALLOCATE_ERROR));
    assert!(allocation.allocation_data.is_none());
    // Authentication never started and no backend call was attempted
    assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    assert!(api.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_allocate_error_when_authentication_fails() {
    let api = Arc::new(FakeMultiplayerApi::new(None, None));
    let factory = Arc::new(FakeFactory::new(api.clone()));
    let auth = FakeAuthApi::failing();
    let allocator = allocator_with(auth, factory.clone());

    let allocation = allocator
        .allocate(&test_context(), allocate_request("1234", vec![]))
        .await;

    assert_eq!(allocation.status, AllocateStatus::Error);
    assert_eq!(allocation.message.as_deref(), Some(ALLOCATE_ERROR));
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_allocate_error_when_authentication_result_is_invalid() {
    let invalid_results = vec![
        // API-level error
        PlayFabApiResult {
            result: None,
            error: Some(PlayFabError {
                code: 401,
                status: "Unauthorized".to_string(),
                error_message: "invalid key".to_string(),
            }),
        },
        // Missing result
        PlayFabApiResult::default(),
        // Empty token
        PlayFabApiResult {
            result: Some(EntityTokenResponse {
                entity_token: String::new(),
                entity: Some(PlayFabEntity {
                    id: "entity-1".to_string(),
                    entity_type: "title".to_string(),
                }),
            }),
            error: None,
        },
        // Missing entity
        PlayFabApiResult {
            result: Some(EntityTokenResponse {
                entity_token: "entity-token".to_string(),
                entity: None,
            }),
            error: None,
        },
        // Empty entity id
        PlayFabApiResult {
            result: Some(EntityTokenResponse {
                entity_token: "entity-token".to_string(),
                entity: Some(PlayFabEntity {
                    id: String::new(),
                    entity_type: "title".to_string(),
                }),
            }),
            error: None,
        },
        // Empty entity type
        PlayFabApiResult {
            result: Some(EntityTokenResponse {
                entity_token: "entity-token".to_string(),
                entity: Some(PlayFabEntity {
                    id: "entity-1".to_string(),
                    entity_type: String::new(),
                }),
            }),
            error: None,
        },
    ];

    for result in invalid_results {
        let api = Arc::new(FakeMultiplayerApi::new(None, None));
        let factory = Arc::new(FakeFactory::new(api.clone()));
        let allocator = allocator_with(FakeAuthApi::returning(result), factory.clone());

        let allocation = allocator
            .allocate(&test_context(), allocate_request("1234", vec![]))
            .await;

        assert_eq!(allocation.status, AllocateStatus::Error);
        assert_eq!(allocation.message.as_deref(), Some(ALLOCATE_ERROR));
        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_allocate_error_when_allocation_result_is_invalid() {
    let invalid_results = vec![
        // Missing result
        PlayFabApiResult::default(),
        // Empty session id
        created_session(""),
    ];

    for result in invalid_results {
        let api = Arc::new(FakeMultiplayerApi::new(Some(result), None));
        let factory = Arc::new(FakeFactory::new(api));
        let allocator = allocator_with(FakeAuthApi::valid(), factory);

        let allocation = allocator
            .allocate(&test_context(), allocate_request("1234", vec![]))
            .await;

        assert_eq!(allocation.status, AllocateStatus::Error);
        assert_eq!(allocation.message.as_deref(), Some(ALLOCATE_ERROR));
        assert!(allocation.allocation_data.is_none());
    }
}

#[tokio::test]
async fn test_allocates_to_default_region_when_region_is_missing() {
    let api = Arc::new(FakeMultiplayerApi::new(Some(created_session("1234")), None));
    let factory = Arc::new(FakeFactory::new(api.clone()));
    let allocator = allocator_with(FakeAuthApi::valid(), factory);

    let allocation = allocator
        .allocate(&test_context(), allocate_request("1234", vec![]))
        .await;

    assert_eq!(allocation.status, AllocateStatus::Created);
    let requests = api.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].preferred_regions, vec!["EastUs"]);
    assert_eq!(requests[0].session_id, "1234");
    assert_eq!(requests[0].build_id, "MY_BUILD_ID");
}

#[tokio::test]
async fn test_allocates_to_specific_region() {
    let api = Arc::new(FakeMultiplayerApi::new(Some(created_session("1234")), None));
    let factory = Arc::new(FakeFactory::new(api.clone()));
    let allocator = allocator_with(FakeAuthApi::valid(), factory);

    let allocation = allocator
        .allocate(
            &test_context(),
            allocate_request("1234", vec![("region", serde_json::json!("WestEurope"))]),
        )
        .await;

    assert_eq!(allocation.status, AllocateStatus::Created);
    match allocation.allocation_data {
        Some(AllocationData::PlayFab {
            playfab_region, ..
        }) => assert_eq!(playfab_region, "WestEurope"),
        other => panic!("Unexpected allocation data: {:?}", other),
    }
    assert_eq!(
        api.requests.lock().unwrap()[0].preferred_regions,
        vec!["WestEurope"]
    );
}

#[tokio::test]
async fn test_allocate_error_when_region_is_empty() {
    let api = Arc::new(FakeMultiplayerApi::new(Some(created_session("1234")), None));
    let factory = Arc::new(FakeFactory::new(api.clone()));
    let allocator = allocator_with(FakeAuthApi::valid(), factory);

    let allocation = allocator
        .allocate(
            &test_context(),
            allocate_request("1234", vec![("region", serde_json::json!("   "))]),
        )
        .await;

    assert_eq!(allocation.status, AllocateStatus::Error);
    assert_eq!(allocation.message.as_deref(), Some(ALLOCATE_ERROR));
    assert!(api.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_poll_allocated_when_server_is_active() {
    let api = Arc::new(FakeMultiplayerApi::new(
        None,
        Some(server_details("Active", "127.0.0.1", vec![1234, 9999])),
    ));
    let factory = Arc::new(FakeFactory::new(api.clone()));
    let allocator = allocator_with(FakeAuthApi::valid(), factory);

    let poll = allocator
        .poll(
            &test_context(),
            PollRequest {
                match_id: "1234".to_string(),
                allocation_data: playfab_allocation_data("1234"),
                requested_at: current_timestamp(),
            },
        )
        .await;

    assert_eq!(poll.status, PollStatus::Allocated);
    assert!(poll.message.is_none());
    // The first port is the game port
    assert_eq!(
        poll.assignment_data,
        Some(Assignment::ip_port("127.0.0.1", 1234))
    );
    assert_eq!(*api.detail_requests.lock().unwrap(), vec!["1234"]);
}

#[tokio::test]
async fn test_poll_pending_while_server_is_starting() {
    for state in ["Initializing", "StandingBy"] {
        let api = Arc::new(FakeMultiplayerApi::new(
            None,
            Some(server_details(state, "", vec![])),
        ));
        let factory = Arc::new(FakeFactory::new(api));
        let allocator = allocator_with(FakeAuthApi::valid(), factory);

        let poll = allocator
            .poll(
                &test_context(),
                PollRequest {
                    match_id: "1234".to_string(),
                    allocation_data: playfab_allocation_data("1234"),
                    requested_at: current_timestamp(),
                },
            )
            .await;

        assert_eq!(poll.status, PollStatus::Pending, "state {}", state);
        assert!(poll.message.is_none());
        assert!(poll.assignment_data.is_none());
    }
}

#[tokio::test]
async fn test_poll_error_when_server_is_terminating() {
    let api = Arc::new(FakeMultiplayerApi::new(
        None,
        Some(server_details("Terminating", "127.0.0.1", vec![1234])),
    ));
    let factory = Arc::new(FakeFactory::new(api));
    let allocator = allocator_with(FakeAuthApi::valid(), factory);

    let poll = allocator
        .poll(
            &test_context(),
            PollRequest {
                match_id: "1234".to_string(),
                allocation_data: playfab_allocation_data("1234"),
                requested_at: current_timestamp(),
            },
        )
        .await;

    assert_eq!(poll.status, PollStatus::Error);
    assert_eq!(poll.message.as_deref(), Some("The server is terminating."));
}

#[tokio::test]
async fn test_poll_error_embeds_unparseable_server_state() {
    let api = Arc::new(FakeMultiplayerApi::new(
        None,
        Some(server_details("InvalidState", "127.0.0.1", vec![1234])),
    ));
    let factory = Arc::new(FakeFactory::new(api));
    let allocator = allocator_with(FakeAuthApi::valid(), factory);

    let poll = allocator
        .poll(
            &test_context(),
            PollRequest {
                match_id: "1234".to_string(),
                allocation_data: playfab_allocation_data("1234"),
                requested_at: current_timestamp(),
            },
        )
        .await;

    assert_eq!(poll.status, PollStatus::Error);
    let message = poll.message.unwrap();
    assert!(message.contains("parsing the server state"));
    assert!(message.contains("InvalidState"));
}

#[tokio::test]
async fn test_poll_error_when_secret_is_not_found() {
    let api = Arc::new(FakeMultiplayerApi::new(
        None,
        Some(server_details("Active", "127.0.0.1", vec![1234])),
    ));
    let factory = Arc::new(FakeFactory::new(api));
    let allocator = PlayFabAllocator::new(
        Arc::new(FailingSecretSource),
        Arc::new(FakeAuthApi::valid()),
        factory,
        settings(),
    );

    let poll = allocator
        .poll(
            &test_context(),
            PollRequest {
                match_id: "1234".to_string(),
                allocation_data: playfab_allocation_data("1234"),
                requested_at: current_timestamp(),
            },
        )
        .await;

    assert_eq!(poll.status, PollStatus::Error);
    assert_eq!(poll.message.as_deref(), Some(POLL_ERROR));
}

#[tokio::test]
async fn test_poll_error_when_details_request_fails() {
    let errored = PlayFabApiResult {
        result: None,
        error: Some(PlayFabError {
            code: 404,
            status: "NotFound".to_string(),
            error_message: "session not found".to_string(),
        }),
    };
    let api = Arc::new(FakeMultiplayerApi::new(None, Some(errored)));
    let factory = Arc::new(FakeFactory::new(api));
    let allocator = allocator_with(FakeAuthApi::valid(), factory);

    let poll = allocator
        .poll(
            &test_context(),
            PollRequest {
                match_id: "wrong-session".to_string(),
                allocation_data: playfab_allocation_data("wrong-session"),
                requested_at: current_timestamp(),
            },
        )
        .await;

    assert_eq!(poll.status, PollStatus::Error);
    // The backend detail is logged, not leaked to the caller
    assert_eq!(poll.message.as_deref(), Some(POLL_ERROR));
}

#[tokio::test]
async fn test_allocation_data_from_allocate_drives_poll_to_terminal_state() {
    let api = Arc::new(FakeMultiplayerApi::new(
        Some(created_session("session-from-response")),
        Some(server_details("Active", "10.1.2.3", vec![31000])),
    ));
    let factory = Arc::new(FakeFactory::new(api.clone()));
    let allocator = allocator_with(FakeAuthApi::valid(), factory);

    let allocation = allocator
        .allocate(&test_context(), allocate_request("1234", vec![]))
        .await;
    assert_eq!(allocation.status, AllocateStatus::Created);
    let allocation_data = allocation.allocation_data.expect("allocation data");

    let poll = allocator
        .poll(
            &test_context(),
            PollRequest {
                match_id: "1234".to_string(),
                allocation_data,
                requested_at: current_timestamp(),
            },
        )
        .await;

    assert_eq!(poll.status, PollStatus::Allocated);
    assert_eq!(
        poll.assignment_data,
        Some(Assignment::ip_port("10.1.2.3", 31000))
    );
    // Poll resolved the session id stored by allocate
    assert_eq!(
        *api.detail_requests.lock().unwrap(),
        vec!["session-from-response"]
    );
}
