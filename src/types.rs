//! Common types used throughout the allocation service
//!
//! These are the canonical request/response types every backend adapter
//! produces and consumes. All of them are per-call, immutable value objects;
//! only `AllocationData` outlives a call, as the continuation state the
//! caller stores and replays into subsequent polls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for matches, assigned by the caller
pub type MatchId = String;

/// Backend fleet services an allocation can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    Agones,
    GameLift,
    Multiplay,
    PlayFab,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Agones => write!(f, "agones"),
            BackendKind::GameLift => write!(f, "gamelift"),
            BackendKind::Multiplay => write!(f, "multiplay"),
            BackendKind::PlayFab => write!(f, "playfab"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "agones" => Ok(BackendKind::Agones),
            "gamelift" => Ok(BackendKind::GameLift),
            "multiplay" => Ok(BackendKind::Multiplay),
            "playfab" => Ok(BackendKind::PlayFab),
            other => Err(format!("Unknown backend: {}", other)),
        }
    }
}

/// Caller-scoped identifiers used to scope backend calls and secret lookups
#[derive(Clone)]
pub struct CallContext {
    pub project_id: String,
    pub environment_id: String,
    pub environment_name: String,
    pub service_token: String,
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("project_id", &self.project_id)
            .field("environment_id", &self.environment_id)
            .field("environment_name", &self.environment_name)
            .field("service_token", &"<redacted>")
            .finish()
    }
}

/// Matchmaker output describing the match a server is being allocated for
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchmakingResults {
    pub pool_id: String,
    pub pool_name: String,
    pub queue_name: String,
    /// Arbitrary match properties, forwarded verbatim to the backend payload
    #[serde(default)]
    pub match_properties: HashMap<String, serde_json::Value>,
}

impl MatchmakingResults {
    /// Read the optional `region` override from the match properties
    pub fn region_hint(&self) -> Option<String> {
        match self.match_properties.get("region") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

/// Request to allocate one game server for a match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateRequest {
    /// Caller-assigned match id, doubling as the backend idempotency key
    pub match_id: MatchId,
    pub matchmaking_results: MatchmakingResults,
}

/// Outcome of an allocation submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocateStatus {
    Created,
    Error,
}

/// Outcome of a poll attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollStatus {
    Pending,
    Allocated,
    Error,
}

/// Continuation state returned by Allocate and replayed into every Poll
///
/// Tagged by the backend that produced it, so a poll is always routed to the
/// adapter that understands it. Field names match what each backend needs to
/// resolve the attempt later; adapters must never assume any server-side
/// session state beyond what is stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "camelCase")]
pub enum AllocationData {
    #[serde(rename_all = "camelCase")]
    Agones { ip: String, port: u16 },
    #[serde(rename_all = "camelCase")]
    GameLift {
        placement_id: String,
        aws_region: String,
        start_time: i64,
        match_id: MatchId,
    },
    #[serde(rename_all = "camelCase")]
    Multiplay {
        allocation_id: String,
        region: String,
    },
    #[serde(rename_all = "camelCase")]
    PlayFab {
        session_id: String,
        playfab_region: String,
        start_time: i64,
        match_id: MatchId,
    },
}

impl AllocationData {
    /// Which backend produced this continuation data
    pub fn backend(&self) -> BackendKind {
        match self {
            AllocationData::Agones { .. } => BackendKind::Agones,
            AllocationData::GameLift { .. } => BackendKind::GameLift,
            AllocationData::Multiplay { .. } => BackendKind::Multiplay,
            AllocationData::PlayFab { .. } => BackendKind::PlayFab,
        }
    }
}

/// Response to an allocation submission
///
/// `allocation_data` is present iff the allocation was created; `message` is
/// present iff the submission failed. Use the constructors to keep those
/// invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateResponse {
    pub status: AllocateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation_data: Option<AllocationData>,
}

impl AllocateResponse {
    /// A successfully created allocation with its continuation data
    pub fn created(allocation_data: AllocationData) -> Self {
        Self {
            status: AllocateStatus::Created,
            message: None,
            allocation_data: Some(allocation_data),
        }
    }

    /// A failed submission with a caller-safe message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: AllocateStatus::Error,
            message: Some(message.into()),
            allocation_data: None,
        }
    }
}

/// Request to poll a previously created allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRequest {
    pub match_id: MatchId,
    /// The continuation data returned by Allocate, unmodified
    pub allocation_data: AllocationData,
    pub requested_at: DateTime<Utc>,
}

/// Canonical connection info handed back once a server is ready
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Assignment {
    IpPort { ip: String, port: u16 },
}

impl Assignment {
    pub fn ip_port(ip: impl Into<String>, port: u16) -> Self {
        Assignment::IpPort {
            ip: ip.into(),
            port,
        }
    }
}

/// Response to a poll attempt
///
/// `assignment` is present iff the server is allocated; `message` is present
/// iff the attempt failed. Use the constructors to keep those invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub status: PollStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_data: Option<Assignment>,
}

impl PollResponse {
    /// The allocation is still in flight
    pub fn pending() -> Self {
        Self {
            status: PollStatus::Pending,
            message: None,
            assignment_data: None,
        }
    }

    /// The server is ready at the given assignment
    pub fn allocated(assignment: Assignment) -> Self {
        Self {
            status: PollStatus::Allocated,
            message: None,
            assignment_data: Some(assignment),
        }
    }

    /// The attempt definitively failed
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: PollStatus::Error,
            message: Some(message.into()),
            assignment_data: None,
        }
    }
}
