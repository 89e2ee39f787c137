//! The guidance provider renders gathering status for the host's prompt
//! context.
//!
//! A pure read of the contact record: either a "complete" confirmation that
//! embeds the stored address and tells the host to stop gathering and probe
//! for receive-intent instead, or a guidance block describing the missing
//! field with format examples and explicit invalid examples. The host injects
//! the text into the oracle's next prompt; nothing parses it.

use std::sync::Arc;

use crate::contact::book::ContactBook;
use crate::contact::{is_placeholder_address, StoreError};

/// Neutral text the pipeline substitutes when guidance cannot be rendered.
pub const FALLBACK_GUIDANCE: &str =
    "Error accessing user information. Continuing conversation normally.";

/// Header prefixed to every status block.
const STATUS_HEADER: &str = "Email information status:\n\n";

/// Guidance rendered while the address is still missing.
const MISSING_GUIDELINES: &str = "\
Missing information and extraction guidelines:

email:
- description: the user's own email address, stated by the user themselves
- valid examples: wkddnjset@naver.com, nick329@gmail.com
- invalid examples: addresses on the domains example.com or test.com \
(placeholders, never genuinely provided)
";

/// Renders gathering guidance from the stored record.
pub struct GuidanceProvider {
    book: Arc<ContactBook>,
}

impl GuidanceProvider {
    /// Create a provider over `book`.
    pub fn new(book: Arc<ContactBook>) -> Self {
        Self { book }
    }

    /// Render the status text for `user_id`.
    ///
    /// An address on a placeholder domain is never presented as a confirmed
    /// value; such records take the missing branch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the record cannot be loaded. The pipeline
    /// substitutes [`FALLBACK_GUIDANCE`] in that case.
    pub async fn render(&self, user_id: &str) -> Result<String, StoreError> {
        let record = self.book.load(user_id).await?;

        match record.email {
            Some(ref address) if !is_placeholder_address(address) => Ok(format!(
                "{STATUS_HEADER}Current information:\nEmail: {address}\n\n\
                 - Status: all necessary information is collected\n\
                 - Continue the conversation naturally; do not ask for the address again\n\
                 - Ask each time whether the user would like to receive the company \
                 introduction document"
            )),
            _ => Ok(format!("{STATUS_HEADER}{MISSING_GUIDELINES}")),
        }
    }
}
