//! Tests for `src/pipeline.rs` — full-turn conversation scenarios.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use courier::contact::book::ContactBook;
use courier::contact::store::InMemoryStore;
use courier::dispatch::{DeliveryOutcome, MaterialDispatch, SightingReport};
use courier::evaluator::{CaptureReport, CompletionEvaluator};
use courier::guidance::GuidanceProvider;
use courier::history::{ConversationTurn, HistorySource, InMemoryHistory, TurnContext};
use courier::oracle::{Oracle, OracleError};
use courier::pipeline::{TurnPipeline, TurnReport};
use courier::transport::{MailTransport, TransportError};

/// Oracle that replays canned replies in order.
struct ScriptedOracle {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<usize>,
}

impl ScriptedOracle {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| (*r).to_owned()).collect()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().expect("call lock should not be poisoned")
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
        let mut calls = self.calls.lock().expect("call lock should not be poisoned");
        *calls = calls.saturating_add(1);
        drop(calls);
        self.replies
            .lock()
            .expect("reply lock should not be poisoned")
            .pop_front()
            .ok_or_else(|| OracleError::Parse("scripted oracle exhausted".to_owned()))
    }
}

/// Transport that records every accepted send.
#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<String>>,
}

impl RecordingTransport {
    fn sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .expect("sent lock should not be poisoned")
            .clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, to_email: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .expect("sent lock should not be poisoned")
            .push(to_email.to_owned());
        Ok(())
    }
}

struct Harness {
    book: Arc<ContactBook>,
    history: Arc<InMemoryHistory>,
    transport: Arc<RecordingTransport>,
    oracle: Arc<ScriptedOracle>,
    pipeline: TurnPipeline,
    room_id: Uuid,
}

fn make_harness(replies: &[&str]) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let book = Arc::new(ContactBook::new(store, "Courier".to_owned()));
    let oracle = Arc::new(ScriptedOracle::new(replies));
    let history = Arc::new(InMemoryHistory::new());
    let transport = Arc::new(RecordingTransport::default());

    let oracle_seam: Arc<dyn Oracle> = oracle.clone();
    let history_seam: Arc<dyn HistorySource> = history.clone();
    let transport_seam: Arc<dyn MailTransport> = transport.clone();

    let pipeline = TurnPipeline::new(
        GuidanceProvider::new(Arc::clone(&book)),
        CompletionEvaluator::new(Arc::clone(&book), Arc::clone(&oracle_seam)),
        MaterialDispatch::new(
            Arc::clone(&book),
            oracle_seam,
            history_seam,
            Some(transport_seam),
        ),
    );

    Harness {
        book,
        history,
        transport,
        oracle,
        pipeline,
        room_id: Uuid::new_v4(),
    }
}

/// Record the visitor's turn in the room and run the pipeline on it.
async fn say(harness: &Harness, text: &str) -> TurnReport {
    harness
        .history
        .push(harness.room_id, ConversationTurn::new("visitor", text))
        .await;
    harness
        .pipeline
        .run_turn(&TurnContext {
            room_id: harness.room_id,
            user_id: "visitor".to_owned(),
            text: text.to_owned(),
        })
        .await
}

#[tokio::test]
async fn volunteered_address_is_captured_without_delivery() {
    // Sweep sees the address, the turn carries no receive-intent, and the
    // gated capture then finds the same address already on record.
    let harness = make_harness(&[
        r#"{"email": "a@b.com"}"#,
        r#"{"is_want_to_receive": false}"#,
        r#"{"email": "a@b.com"}"#,
    ]);

    let report = say(&harness, "my email is a@b.com").await;

    assert_eq!(
        report.sighting,
        Some(SightingReport::Recorded {
            address: "a@b.com".to_owned(),
            wants_material: false,
        })
    );
    assert!(report.capture_gate);
    assert_eq!(report.capture, Some(CaptureReport::AlreadySet));
    assert!(report.guidance.contains("a@b.com"));
    assert_eq!(report.delivery, Some(DeliveryOutcome::Declined));
    assert!(report.failures.is_empty());
    assert!(harness.transport.sent().is_empty());

    let record = harness.book.load("visitor").await.expect("load should succeed");
    assert_eq!(record.email.as_deref(), Some("a@b.com"));
    assert_eq!(record.wants_material, Some(false));
}

#[tokio::test]
async fn brochure_request_after_capture_triggers_delivery() {
    let harness = make_harness(&[
        r#"{"email": "a@b.com"}"#,
        r#"{"is_want_to_receive": true}"#,
        "{}",
    ]);
    harness
        .book
        .record_sighting("visitor", "a@b.com", false)
        .await
        .expect("preset sighting should succeed");

    let report = say(&harness, "please send me your brochure").await;

    assert_eq!(
        report.sighting,
        Some(SightingReport::Recorded {
            address: "a@b.com".to_owned(),
            wants_material: true,
        })
    );
    assert_eq!(report.capture, Some(CaptureReport::NothingFound));
    assert_eq!(report.delivery, Some(DeliveryOutcome::Sent));
    assert_eq!(harness.transport.sent(), vec!["a@b.com".to_owned()]);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn placeholder_mention_leaves_the_record_empty() {
    // The oracle abstains on placeholder domains, so the sweep finds nothing
    // and the closed gate skips capture entirely: one oracle call.
    let harness = make_harness(&["{}"]);

    let report = say(&harness, "just use test@example.com or whatever").await;

    assert_eq!(report.sighting, Some(SightingReport::NoAddress));
    assert!(!report.capture_gate);
    assert_eq!(report.capture, None);
    assert!(report.guidance.contains("Missing information"));
    assert_eq!(report.delivery, Some(DeliveryOutcome::Declined));
    assert_eq!(harness.oracle.calls(), 1);

    let record = harness.book.load("visitor").await.expect("load should succeed");
    assert!(!record.is_complete());
}

#[tokio::test]
async fn intent_flips_back_down_and_blocks_delivery() {
    let harness = make_harness(&[
        r#"{"email": "a@b.com"}"#,
        r#"{"is_want_to_receive": false}"#,
        "{}",
    ]);
    harness
        .book
        .record_sighting("visitor", "a@b.com", true)
        .await
        .expect("preset sighting should succeed");

    let report = say(&harness, "actually, no need to send anything").await;

    assert_eq!(report.delivery, Some(DeliveryOutcome::Declined));
    assert!(harness.transport.sent().is_empty());

    let record = harness.book.load("visitor").await.expect("load should succeed");
    assert_eq!(record.wants_material, Some(false));
}

#[tokio::test]
async fn second_turn_keeps_guidance_complete() {
    // Once complete, the guidance stays on the confirmation branch even when
    // the later turn has no address at all.
    let harness = make_harness(&["{}", "{}"]);
    harness
        .book
        .record_sighting("visitor", "a@b.com", false)
        .await
        .expect("preset sighting should succeed");

    let report = say(&harness, "thanks!").await;

    // Sweep abstained, so nothing was overwritten; capture ran and found
    // nothing new.
    assert_eq!(report.sighting, Some(SightingReport::NoAddress));
    assert!(report.capture_gate);
    assert_eq!(report.capture, Some(CaptureReport::NothingFound));
    assert!(report.guidance.contains("a@b.com"));
    assert!(report.guidance.contains("all necessary information is collected"));
}
