//! Material dispatch: the sighting sweep and the gated delivery.
//!
//! [`MaterialDispatch::observe`] runs once per turn. It asks the oracle for
//! the most recently mentioned user-owned address across the whole visible
//! room history, classifies the latest turn for receive-intent, and
//! overwrites the record with both results. [`MaterialDispatch::deliver`]
//! reads the record back and invokes the mail transport only when the record
//! is send-eligible. The sweep is side-effecting; the delivery gate is not.

use std::sync::Arc;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::contact::book::ContactBook;
use crate::contact::StoreError;
use crate::history::{user_transcript, HistoryError, HistorySource, TurnContext};
use crate::oracle::{read_bool_field, read_text_field, Oracle, OracleError};
use crate::transport::{MailTransport, TransportError};

/// Errors from dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The record store failed.
    #[error("record store: {0}")]
    Store(#[from] StoreError),

    /// The extraction oracle failed.
    #[error("extraction oracle: {0}")]
    Oracle(#[from] OracleError),

    /// The conversation history could not be read.
    #[error("conversation history: {0}")]
    History(#[from] HistoryError),

    /// The mail transport failed.
    #[error("mail transport: {0}")]
    Transport(#[from] TransportError),
}

/// Outcome of one observation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SightingReport {
    /// An owned address was sighted; both record fields were overwritten.
    Recorded {
        /// The address written to the record.
        address: String,
        /// This turn's intent classification.
        wants_material: bool,
    },
    /// No owned, format-valid address in the transcript; nothing was written.
    NoAddress,
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The transport accepted the send.
    Sent,
    /// No current receive-intent on record; nothing was sent.
    Declined,
    /// Intent is recorded but the record holds no address.
    MissingAddress,
    /// No transport is wired; the send step is a no-op.
    NotConfigured,
}

impl DeliveryOutcome {
    /// Short human-readable form for CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "material sent",
            Self::Declined => "declined (no receive intent)",
            Self::MissingAddress => "no address on record",
            Self::NotConfigured => "transport not configured",
        }
    }
}

/// Sighting sweep and gated delivery over the shared contact record.
pub struct MaterialDispatch {
    book: Arc<ContactBook>,
    oracle: Arc<dyn Oracle>,
    history: Arc<dyn HistorySource>,
    transport: Option<Arc<dyn MailTransport>>,
}

impl MaterialDispatch {
    /// Create a dispatcher over its collaborators.
    ///
    /// `transport` may be `None`; delivery then reports
    /// [`DeliveryOutcome::NotConfigured`] instead of sending.
    pub fn new(
        book: Arc<ContactBook>,
        oracle: Arc<dyn Oracle>,
        history: Arc<dyn HistorySource>,
        transport: Option<Arc<dyn MailTransport>>,
    ) -> Self {
        Self {
            book,
            oracle,
            history,
            transport,
        }
    }

    /// Sweep the room history for an owned address, classify this turn's
    /// receive-intent, and overwrite the record with both.
    ///
    /// Agent-authored turns never reach the sweep prompt. A missing or
    /// malformed address short-circuits without the intent call and without
    /// a write; a missing intent field on an otherwise well-formed reply
    /// counts as no intent.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on history, oracle, or store failure.
    pub async fn observe(&self, turn: &TurnContext) -> Result<SightingReport, DispatchError> {
        let turns = self.history.room_turns(turn.room_id).await?;
        let transcript = user_transcript(&turns, self.book.agent_name());

        let reply = self
            .oracle
            .generate(&build_sweep_prompt(&transcript))
            .await?;
        let Some(address) = read_text_field(&reply, "email")? else {
            debug!(user = %turn.user_id, "observe: no address in transcript");
            return Ok(SightingReport::NoAddress);
        };
        if !looks_like_address(&address) {
            debug!(
                user = %turn.user_id,
                candidate = %address,
                "observe: oracle returned a malformed address"
            );
            return Ok(SightingReport::NoAddress);
        }

        let intent_reply = self
            .oracle
            .generate(&build_intent_prompt(&turn.text))
            .await?;
        let wants_material = read_bool_field(&intent_reply, "is_want_to_receive")?.unwrap_or(false);

        self.book
            .record_sighting(&turn.user_id, &address, wants_material)
            .await?;
        debug!(user = %turn.user_id, wants_material, "observe: sighting recorded");

        Ok(SightingReport::Recorded {
            address,
            wants_material,
        })
    }

    /// Deliver material to the recorded address if the record is
    /// send-eligible.
    ///
    /// Intent is checked before the address, so a bare intent without a
    /// stored address reports [`DeliveryOutcome::MissingAddress`] rather than
    /// declining.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] on store or transport failure.
    pub async fn deliver(&self, user_id: &str) -> Result<DeliveryOutcome, DispatchError> {
        let record = self.book.load(user_id).await?;

        if record.wants_material != Some(true) {
            debug!(user = %user_id, "deliver: no receive intent on record");
            return Ok(DeliveryOutcome::Declined);
        }
        let Some(address) = record.email else {
            debug!(user = %user_id, "deliver: intent without an address");
            return Ok(DeliveryOutcome::MissingAddress);
        };
        let Some(transport) = &self.transport else {
            debug!(user = %user_id, "deliver: no transport configured");
            return Ok(DeliveryOutcome::NotConfigured);
        };

        transport.send(&address).await?;
        info!(user = %user_id, email = %address, "material dispatched");
        Ok(DeliveryOutcome::Sent)
    }
}

/// Rough shape check for oracle-returned addresses (`local@domain.tld`).
const ADDRESS_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Whether `candidate` has the shape of an email address.
pub fn looks_like_address(candidate: &str) -> bool {
    Regex::new(ADDRESS_PATTERN).is_ok_and(|re| re.is_match(candidate))
}

/// Build the history-wide owned-address sweep prompt.
///
/// The oracle must return only an address the user clearly indicates is
/// their own, the most recently mentioned one when several appear, and an
/// empty value under uncertainty.
pub fn build_sweep_prompt(transcript: &str) -> String {
    format!(
        "Extract email addresses mentioned by the user in the conversation below.\n\
         Only extract addresses the user clearly indicates are their own.\n\n\
         Conversation:\n{transcript}\n\n\
         Return a JSON object in the following format:\n\
         {{\n    \"email\": \"explicitly mentioned email address\"\n}}\n\n\
         Important:\n\
         - Verify the format is a valid address (e.g. xxx@xxx.xxx)\n\
         - Leave the value empty if uncertain or if the address belongs to someone else\n\
         - If multiple addresses are mentioned, use the most recently mentioned one"
    )
}

/// Build the latest-turn receive-intent classification prompt.
pub fn build_intent_prompt(turn_text: &str) -> String {
    format!(
        "Check whether the user is expressing interest in receiving company \
         information or materials.\n\n\
         Conversation:\n{turn_text}\n\n\
         Return a JSON object in the following format:\n\
         {{\n    \"is_want_to_receive\": true or false\n}}\n\n\
         Return true if the user explicitly requests company information, asks for \
         materials or brochures, or wants details sent by email. Return false when \
         there is no clear request or the request is ambiguous. Example phrasings \
         that mean true: \"Please send me company information\", \"Can I get more \
         details?\", \"I'd like to receive materials by email\", \"Could you share \
         the company brochure?\""
    )
}
