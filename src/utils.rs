//! Utility functions for the allocation service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as milliseconds since the Unix epoch, as stored in
/// continuation data `start_time` fields
pub fn unix_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Generate a correlation id for request logging
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
