//! The contact book, a data-access gateway for contact records.
//!
//! Sole owner of key construction, write policy, and expiry stamping. The
//! evaluator's email capture goes through [`ContactBook::fill_email`]
//! (fill-once: an existing address is never overwritten); the dispatch
//! sighting sweep goes through [`ContactBook::record_sighting`] (overwrite:
//! both fields replaced). Every write stamps the same 7-day expiry.

use std::sync::Arc;

use chrono::Utc;

use super::store::ContactStore;
use super::{default_expiry, record_key, ContactRecord, StoreError};

/// Outcome of a fill-once email write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// The address was written into the previously empty field.
    Filled(ContactRecord),
    /// The field already held an address; the write was skipped.
    AlreadySet,
}

/// Data-access gateway for per-user contact records.
pub struct ContactBook {
    store: Arc<dyn ContactStore>,
    agent_name: String,
}

impl ContactBook {
    /// Create a book for the given agent identity over `store`.
    pub fn new(store: Arc<dyn ContactStore>, agent_name: String) -> Self {
        Self { store, agent_name }
    }

    /// The agent display name this book keys records under.
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    fn key(&self, user_id: &str) -> String {
        record_key(&self.agent_name, user_id)
    }

    /// Load the record for `user_id`, or an empty record if none is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn load(&self, user_id: &str) -> Result<ContactRecord, StoreError> {
        Ok(self.store.get(&self.key(user_id)).await?.unwrap_or_default())
    }

    /// Fill-once write of the email field.
    ///
    /// Writes `address` only when the stored record holds no address yet, so
    /// a later, lower-confidence extraction can never replace a confirmed
    /// one. The check and the write run under one gateway call; every mutation
    /// path shares this policy instead of re-implementing it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read or written.
    pub async fn fill_email(
        &self,
        user_id: &str,
        address: &str,
    ) -> Result<FillOutcome, StoreError> {
        let key = self.key(user_id);
        let mut record = self.store.get(&key).await?.unwrap_or_default();
        if record.email.is_some() {
            return Ok(FillOutcome::AlreadySet);
        }
        record.email = Some(address.to_owned());
        self.store
            .put(&key, &record, default_expiry(Utc::now()))
            .await?;
        Ok(FillOutcome::Filled(record))
    }

    /// Overwrite write from the dispatch sighting sweep.
    ///
    /// Replaces both fields unconditionally: `address` is the sweep's most
    /// recent owned address, and `wants_material` is this turn's intent
    /// classification, which may flip in either direction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub async fn record_sighting(
        &self,
        user_id: &str,
        address: &str,
        wants_material: bool,
    ) -> Result<ContactRecord, StoreError> {
        let record = ContactRecord {
            email: Some(address.to_owned()),
            wants_material: Some(wants_material),
        };
        self.store
            .put(&self.key(user_id), &record, default_expiry(Utc::now()))
            .await?;
        Ok(record)
    }
}
