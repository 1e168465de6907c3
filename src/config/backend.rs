//! Per-backend settings
//!
//! Each backend gets its own settings struct with deployment-specific
//! identifiers (fleets, queues, builds) and a default region used when a
//! match carries no `region` property.

use serde::{Deserialize, Serialize};

/// Settings for the Agones allocator service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgonesSettings {
    /// Base URL of the Agones allocator service
    pub allocator_base_url: String,
}

impl Default for AgonesSettings {
    fn default() -> Self {
        Self {
            allocator_base_url: "http://agones-allocator.agones-system.svc".to_string(),
        }
    }
}

/// Settings for AWS GameLift placements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameLiftSettings {
    /// Game session queue placements are submitted to
    pub queue_name: String,
    /// AWS region used when the match carries no region property
    pub default_region: String,
    /// Fallback maximum player session count when the config store has no
    /// override for the queue
    pub default_max_player_session_count: u32,
}

impl Default for GameLiftSettings {
    fn default() -> Self {
        Self {
            queue_name: "default-queue".to_string(),
            default_region: "eu-west-2".to_string(),
            default_max_player_session_count: 10,
        }
    }
}

/// Settings for Unity Multiplay fleet allocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiplaySettings {
    /// Multiplay services API host
    pub host: String,
    /// Fleet to allocate servers from
    pub fleet_id: String,
    /// Build configuration servers are started with
    pub build_configuration_id: i64,
    /// Region used when the match carries no region property
    pub default_region: String,
}

impl Default for MultiplaySettings {
    fn default() -> Self {
        Self {
            host: "multiplay.services.api.unity.com".to_string(),
            fleet_id: String::new(),
            build_configuration_id: 0,
            default_region: String::new(),
        }
    }
}

/// Settings for Azure PlayFab multiplayer servers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayFabSettings {
    /// PlayFab title id
    pub title_id: String,
    /// Build the multiplayer servers are requested against
    pub build_id: String,
    /// Region used when the match carries no region property
    pub default_region: String,
}

impl Default for PlayFabSettings {
    fn default() -> Self {
        Self {
            title_id: String::new(),
            build_id: String::new(),
            default_region: "EastUs".to_string(),
        }
    }
}
