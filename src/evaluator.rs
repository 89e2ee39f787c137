//! The completion evaluator: per-turn email capture with a fill-once merge.
//!
//! Each turn, the latest message text goes to the extraction oracle with a
//! prompt demanding explicit self-assertion and abstention under ambiguity.
//! A returned address is merged into the record through the contact book's
//! fill-once write, so the precision/recall trade-off lives in the extraction
//! step and the merge step stays trivially safe.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::contact::book::{ContactBook, FillOutcome};
use crate::contact::{ContactRecord, StoreError};
use crate::history::TurnContext;
use crate::oracle::{read_text_field, Oracle, OracleError};

/// Errors from evaluator operations.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    /// The record store failed.
    #[error("record store: {0}")]
    Store(#[from] StoreError),

    /// The extraction oracle failed.
    #[error("extraction oracle: {0}")]
    Oracle(#[from] OracleError),
}

/// Outcome of one capture pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureReport {
    /// The extracted address was written into the empty record.
    Filled(ContactRecord),
    /// An address was extracted but the record already holds one; fill-once
    /// skipped the write.
    AlreadySet,
    /// The oracle abstained; nothing was written.
    NothingFound,
}

/// Per-turn email capture over the contact book and the extraction oracle.
pub struct CompletionEvaluator {
    book: Arc<ContactBook>,
    oracle: Arc<dyn Oracle>,
}

impl CompletionEvaluator {
    /// Create an evaluator over its collaborators.
    pub fn new(book: Arc<ContactBook>, oracle: Arc<dyn Oracle>) -> Self {
        Self { book, oracle }
    }

    /// Gate for the capture step: the record's completeness predicate.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError::Store`] if the record cannot be loaded. The
    /// pipeline maps that to a `false` gate.
    pub async fn should_run(&self, user_id: &str) -> Result<bool, EvaluatorError> {
        // TODO: revisit the gate polarity. Capture currently runs only once
        // the record is already complete, which looks inverted for a
        // component whose job is to reach completion; see DESIGN.md
        // ("evaluator gate polarity") before flipping it.
        let record = self.book.load(user_id).await?;
        Ok(record.is_complete())
    }

    /// Submit the latest turn's text to the oracle and merge any extracted
    /// address into the record, fill-once.
    ///
    /// Emits an info-level audit entry when the write makes the record
    /// complete.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] on oracle or store failure. A reply with no
    /// address is not an error; it reports [`CaptureReport::NothingFound`].
    pub async fn capture(&self, turn: &TurnContext) -> Result<CaptureReport, EvaluatorError> {
        let prompt = build_capture_prompt(&turn.text);
        let reply = self.oracle.generate(&prompt).await?;

        let Some(address) = read_text_field(&reply, "email")? else {
            debug!(user = %turn.user_id, "capture: oracle abstained");
            return Ok(CaptureReport::NothingFound);
        };

        match self.book.fill_email(&turn.user_id, &address).await? {
            FillOutcome::Filled(record) => {
                if record.is_complete() {
                    info!(
                        user = %turn.user_id,
                        email = %address,
                        "contact record complete"
                    );
                }
                Ok(CaptureReport::Filled(record))
            }
            FillOutcome::AlreadySet => {
                debug!(
                    user = %turn.user_id,
                    "capture: address already on record, fill-once skipped the write"
                );
                Ok(CaptureReport::AlreadySet)
            }
        }
    }
}

/// Build the single-turn extraction prompt.
///
/// The oracle must only return an address the user explicitly states as
/// their own, and must omit the field when the mention is uncertain,
/// hypothetical, third-party, or on a placeholder domain.
pub fn build_capture_prompt(turn_text: &str) -> String {
    format!(
        "Analyze the following conversation turn and extract personal information.\n\
         Only extract information the user explicitly states about themselves.\n\n\
         Turn:\n{turn_text}\n\n\
         Return a JSON object containing only clearly identified information:\n\
         {{\n    \"email\": \"the stated email address\"\n}}\n\n\
         Omit the field entirely if the information is unclear, hypothetical, or about \
         someone else. Addresses on placeholder domains such as example.com or test.com \
         are not genuinely provided; omit the field for those as well."
    )
}
