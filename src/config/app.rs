//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! fleet-allocator service, including environment variable loading and
//! validation.

use crate::config::backend::{
    AgonesSettings, GameLiftSettings, MultiplaySettings, PlayFabSettings,
};
use crate::types::{BackendKind, CallContext};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub context: ContextSettings,
    pub allocator: AllocatorSettings,
    pub agones: AgonesSettings,
    pub gamelift: GameLiftSettings,
    pub multiplay: MultiplaySettings,
    pub playfab: PlayFabSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host the HTTP API binds to
    pub host: String,
    /// Port the HTTP API binds to
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "fleet-allocator".to_string(),
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

/// Project/environment identity used to scope backend calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSettings {
    pub project_id: String,
    pub environment_id: String,
    pub environment_name: String,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            environment_id: String::new(),
            environment_name: "production".to_string(),
        }
    }
}

impl ContextSettings {
    /// Build the per-call context, picking up the caller-scoped service
    /// token from `ALLOCATOR_SERVICE_TOKEN`
    pub fn call_context(&self) -> CallContext {
        CallContext {
            project_id: self.project_id.clone(),
            environment_id: self.environment_id.clone(),
            environment_name: self.environment_name.clone(),
            service_token: env::var("ALLOCATOR_SERVICE_TOKEN").unwrap_or_default(),
        }
    }
}

/// Allocation dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorSettings {
    /// Backend new allocations are dispatched to
    pub backend: String,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            backend: "multiplay".to_string(),
        }
    }
}

impl AllocatorSettings {
    /// Parse the configured backend selection
    pub fn backend_kind(&self) -> Result<BackendKind> {
        self.backend
            .parse::<BackendKind>()
            .map_err(|e| anyhow!("Invalid allocator backend: {}", e))
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            config.service.host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            config.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Context settings
        if let Ok(project_id) = env::var("PROJECT_ID") {
            config.context.project_id = project_id;
        }
        if let Ok(environment_id) = env::var("ENVIRONMENT_ID") {
            config.context.environment_id = environment_id;
        }
        if let Ok(environment_name) = env::var("ENVIRONMENT_NAME") {
            config.context.environment_name = environment_name;
        }

        // Backend selection
        if let Ok(backend) = env::var("ALLOCATOR_BACKEND") {
            config.allocator.backend = backend;
        }

        // Agones settings
        if let Ok(url) = env::var("AGONES_ALLOCATOR_BASE_URL") {
            config.agones.allocator_base_url = url;
        }

        // GameLift settings
        if let Ok(queue) = env::var("GAMELIFT_QUEUE_NAME") {
            config.gamelift.queue_name = queue;
        }
        if let Ok(region) = env::var("GAMELIFT_DEFAULT_REGION") {
            config.gamelift.default_region = region;
        }
        if let Ok(count) = env::var("GAMELIFT_DEFAULT_MAX_PLAYER_SESSION_COUNT") {
            config.gamelift.default_max_player_session_count = count.parse().map_err(|_| {
                anyhow!(
                    "Invalid GAMELIFT_DEFAULT_MAX_PLAYER_SESSION_COUNT value: {}",
                    count
                )
            })?;
        }

        // Multiplay settings
        if let Ok(host) = env::var("MULTIPLAY_HOST") {
            config.multiplay.host = host;
        }
        if let Ok(fleet) = env::var("MULTIPLAY_FLEET_ID") {
            config.multiplay.fleet_id = fleet;
        }
        if let Ok(build) = env::var("MULTIPLAY_BUILD_CONFIGURATION_ID") {
            config.multiplay.build_configuration_id = build.parse().map_err(|_| {
                anyhow!("Invalid MULTIPLAY_BUILD_CONFIGURATION_ID value: {}", build)
            })?;
        }
        if let Ok(region) = env::var("MULTIPLAY_DEFAULT_REGION") {
            config.multiplay.default_region = region;
        }

        // PlayFab settings
        if let Ok(title) = env::var("PLAYFAB_TITLE_ID") {
            config.playfab.title_id = title;
        }
        if let Ok(build) = env::var("PLAYFAB_BUILD_ID") {
            config.playfab.build_id = build;
        }
        if let Ok(region) = env::var("PLAYFAB_DEFAULT_REGION") {
            config.playfab.default_region = region;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate backend selection
    config.allocator.backend_kind()?;

    // Validate backend settings referenced by the selected backend
    match config.allocator.backend_kind()? {
        BackendKind::Agones => {
            if config.agones.allocator_base_url.is_empty() {
                return Err(anyhow!("Agones allocator base URL cannot be empty"));
            }
        }
        BackendKind::GameLift => {
            if config.gamelift.queue_name.is_empty() {
                return Err(anyhow!("GameLift queue name cannot be empty"));
            }
            if config.gamelift.default_region.is_empty() {
                return Err(anyhow!("GameLift default region cannot be empty"));
            }
            if config.gamelift.default_max_player_session_count == 0 {
                return Err(anyhow!(
                    "GameLift default max player session count must be greater than 0"
                ));
            }
        }
        BackendKind::Multiplay => {
            if config.multiplay.host.is_empty() {
                return Err(anyhow!("Multiplay host cannot be empty"));
            }
            if config.multiplay.fleet_id.is_empty() {
                return Err(anyhow!("Multiplay fleet id cannot be empty"));
            }
        }
        BackendKind::PlayFab => {
            if config.playfab.title_id.is_empty() {
                return Err(anyhow!("PlayFab title id cannot be empty"));
            }
            if config.playfab.build_id.is_empty() {
                return Err(anyhow!("PlayFab build id cannot be empty"));
            }
        }
    }

    Ok(())
}
