//! Contact record data model and persistence.
//!
//! One [`ContactRecord`] exists per (agent, user) pair, stored under the
//! composite key built by [`record_key`]. All reads and writes go through the
//! [`book::ContactBook`] gateway, which owns the two write policies: fill-once
//! for the evaluator's email capture and overwrite for the dispatch sighting
//! sweep. Store implementations live in [`store`] (in-memory) and [`sqlite`]
//! (durable).

pub mod book;
pub mod sqlite;
pub mod store;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a stored record stays readable after its last write.
pub const RECORD_TTL_DAYS: i64 = 7;

/// Domains whose addresses are treated as placeholders, never as genuinely
/// provided contact information.
pub const PLACEHOLDER_DOMAINS: [&str; 2] = ["example.com", "test.com"];

/// The per-(agent, user) record this subsystem gathers.
///
/// Both fields start unknown. `email` is filled once by the evaluator and
/// only replaced by the dispatch sweep's overwrite; `wants_material` is
/// re-evaluated every turn and may flip in either direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// The user's email address once volunteered; `None` means unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the user currently wants to receive material. Not sticky.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wants_material: Option<bool>,
}

impl ContactRecord {
    /// Completeness predicate: the record is complete once the address is
    /// present. `wants_material` does not participate.
    pub fn is_complete(&self) -> bool {
        self.email.is_some()
    }

    /// Send-eligibility: the address is present and the latest intent
    /// classification was `true`.
    pub fn is_send_eligible(&self) -> bool {
        self.email.is_some() && self.wants_material == Some(true)
    }
}

/// Build the composite store key for an (agent, user) pair.
///
/// Format: `{agent_name}/{user_id}/data`. The agent name is validated at
/// config load to contain no `/`; user ids come from the host and are not
/// sanitized here.
pub fn record_key(agent_name: &str, user_id: &str) -> String {
    format!("{agent_name}/{user_id}/data")
}

/// Whether an address sits on a known placeholder domain.
///
/// Matches the part after the last `@` case-insensitively against
/// [`PLACEHOLDER_DOMAINS`]. Strings without an `@` are not placeholders.
pub fn is_placeholder_address(address: &str) -> bool {
    let Some((_, domain)) = address.rsplit_once('@') else {
        return false;
    };
    let domain = domain.to_ascii_lowercase();
    PLACEHOLDER_DOMAINS.iter().any(|known| domain == *known)
}

/// Absolute expiry stamp for a record written at `now`.
pub fn default_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(RECORD_TTL_DAYS))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Errors from contact store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored record could not be encoded or decoded.
    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store backend is unavailable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
