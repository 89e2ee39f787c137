//! Courier — conversational contact capture and material dispatch.
//!
//! Tracks one piece of volunteered information (the user's email address)
//! across a multi-turn conversation, decides when gathering is complete, and
//! gates a one-shot outbound send on completion plus explicitly expressed
//! receive-intent. Three components share one durable per-user record and
//! run in a fixed order each turn; the record store, extraction oracle,
//! conversation history, and mail transport all sit behind traits.
//!
//! See `DESIGN.md` for the component ledger and open-question decisions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod contact;
pub mod history;
pub mod logging;
pub mod oracle;
pub mod transport;

pub mod dispatch;
pub mod evaluator;
pub mod guidance;

pub mod pipeline;
