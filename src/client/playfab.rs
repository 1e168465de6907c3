//! HTTP clients for the PlayFab REST APIs
//!
//! PlayFab wraps every REST response in a `{code, status, data}` envelope,
//! with error detail at the top level on failure. Both clients parse the
//! envelope regardless of the HTTP status and surface API-level errors
//! through `PlayFabApiResult`, leaving transport faults as `Transport`
//! errors.

use crate::allocator::playfab::{
    EntityTokenResponse, MultiplayerServerDetails, PlayFabApiResult, PlayFabApiSettings,
    PlayFabAuthApi, PlayFabAuthenticationContext, PlayFabClientFactory, PlayFabError,
    PlayFabMultiplayerApi, RequestMultiplayerServerRequest, RequestMultiplayerServerResponse,
};
use crate::error::AllocatorError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Top-level REST envelope around every PlayFab response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestEnvelope<T> {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    status: String,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    error_code: Option<i32>,
    #[serde(default)]
    error_message: Option<String>,
}

impl<T> RestEnvelope<T> {
    fn into_api_result(self) -> PlayFabApiResult<T> {
        match self.data {
            Some(data) => PlayFabApiResult {
                result: Some(data),
                error: None,
            },
            None => PlayFabApiResult {
                result: None,
                error: Some(PlayFabError {
                    code: self.error_code.unwrap_or(self.code),
                    status: self.status,
                    error_message: self.error_message.unwrap_or_default(),
                }),
            },
        }
    }
}

fn api_url(title_id: &str, path: &str) -> String {
    format!("https://{}.playfabapi.com{}", title_id, path)
}

fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}

async fn parse_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<PlayFabApiResult<T>, AllocatorError> {
    response
        .json::<RestEnvelope<T>>()
        .await
        .map(RestEnvelope::into_api_result)
        .map_err(AllocatorError::transport)
}

/// PlayFab authentication API client
pub struct HttpPlayFabAuthApi {
    client: Client,
}

impl HttpPlayFabAuthApi {
    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }
}

impl Default for HttpPlayFabAuthApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlayFabAuthApi for HttpPlayFabAuthApi {
    async fn get_entity_token(
        &self,
        settings: &PlayFabApiSettings,
    ) -> Result<PlayFabApiResult<EntityTokenResponse>, AllocatorError> {
        let response = self
            .client
            .post(api_url(&settings.title_id, "/Authentication/GetEntityToken"))
            .header("X-SecretKey", &settings.developer_secret_key)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(AllocatorError::transport)?;

        parse_envelope(response).await
    }
}

/// Factory producing entity-token-scoped multiplayer API clients
pub struct HttpPlayFabClientFactory;

impl HttpPlayFabClientFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HttpPlayFabClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayFabClientFactory for HttpPlayFabClientFactory {
    fn create_multiplayer_api(
        &self,
        settings: &PlayFabApiSettings,
        auth: &PlayFabAuthenticationContext,
    ) -> Arc<dyn PlayFabMultiplayerApi> {
        Arc::new(HttpPlayFabMultiplayerApi {
            title_id: settings.title_id.clone(),
            entity_token: auth.entity_token.clone(),
            client: http_client(),
        })
    }
}

/// PlayFab multiplayer server API client scoped to one entity token
pub struct HttpPlayFabMultiplayerApi {
    title_id: String,
    entity_token: String,
    client: Client,
}

#[async_trait]
impl PlayFabMultiplayerApi for HttpPlayFabMultiplayerApi {
    async fn request_multiplayer_server(
        &self,
        request: &RequestMultiplayerServerRequest,
    ) -> Result<PlayFabApiResult<RequestMultiplayerServerResponse>, AllocatorError> {
        let response = self
            .client
            .post(api_url(
                &self.title_id,
                "/MultiplayerServer/RequestMultiplayerServer",
            ))
            .header("X-EntityToken", &self.entity_token)
            .json(request)
            .send()
            .await
            .map_err(AllocatorError::transport)?;

        parse_envelope(response).await
    }

    async fn get_multiplayer_server_details(
        &self,
        session_id: &str,
    ) -> Result<PlayFabApiResult<MultiplayerServerDetails>, AllocatorError> {
        let response = self
            .client
            .post(api_url(
                &self.title_id,
                "/MultiplayerServer/GetMultiplayerServerDetails",
            ))
            .header("X-EntityToken", &self.entity_token)
            .json(&serde_json::json!({ "SessionId": session_id }))
            .send()
            .await
            .map_err(AllocatorError::transport)?;

        parse_envelope(response).await
    }
}
