//! Conversation history access.
//!
//! The host runtime owns message delivery and storage; this module defines
//! only the read seam the dispatch sweep needs (ordered turns for a room),
//! the in-memory implementation the chat harness uses, and the transcript
//! helper that strips agent-authored turns before extraction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// A single turn of conversation as seen by this subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    /// Display name of the author, agent or user.
    pub author: String,
    /// Raw message text.
    pub text: String,
    /// When the turn was recorded.
    pub sent_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn stamped with the current time.
    pub fn new(author: &str, text: &str) -> Self {
        Self {
            author: author.to_owned(),
            text: text.to_owned(),
            sent_at: Utc::now(),
        }
    }
}

/// The incoming turn the host hands to the pipeline, once per message.
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Room (conversation) the turn belongs to.
    pub room_id: Uuid,
    /// Stable identity of the user speaking.
    pub user_id: String,
    /// The latest turn's raw text.
    pub text: String,
}

/// Errors from conversation history access.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The history backend could not be read.
    #[error("history unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the ordered turns of a room.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// All turns recorded for `room_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] if the backend cannot be read.
    async fn room_turns(&self, room_id: Uuid) -> Result<Vec<ConversationTurn>, HistoryError>;
}

/// Per-room turn log held in memory, used by the chat harness and tests.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    rooms: RwLock<HashMap<Uuid, Vec<ConversationTurn>>>,
}

impl InMemoryHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to a room, creating the room on first use.
    pub async fn push(&self, room_id: Uuid, turn: ConversationTurn) {
        self.rooms
            .write()
            .await
            .entry(room_id)
            .or_default()
            .push(turn);
    }
}

#[async_trait]
impl HistorySource for InMemoryHistory {
    async fn room_turns(&self, room_id: Uuid) -> Result<Vec<ConversationTurn>, HistoryError> {
        Ok(self
            .rooms
            .read()
            .await
            .get(&room_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Concatenate the user-authored turns of a room, oldest first.
///
/// Turns authored by the agent itself (matched by display name) are dropped
/// so the sweep never extracts an address the agent mentioned; the remaining
/// texts are joined with newlines.
pub fn user_transcript(turns: &[ConversationTurn], agent_name: &str) -> String {
    turns
        .iter()
        .filter(|turn| turn.author != agent_name)
        .map(|turn| turn.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
