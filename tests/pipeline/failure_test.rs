//! Tests for `src/pipeline.rs` — boundary degradation under failures.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use courier::contact::book::ContactBook;
use courier::contact::store::{ContactStore, InMemoryStore};
use courier::contact::{ContactRecord, StoreError};
use courier::dispatch::{DeliveryOutcome, MaterialDispatch};
use courier::evaluator::CompletionEvaluator;
use courier::guidance::{GuidanceProvider, FALLBACK_GUIDANCE};
use courier::history::{ConversationTurn, HistoryError, HistorySource, InMemoryHistory, TurnContext};
use courier::oracle::{Oracle, OracleError};
use courier::pipeline::{FailureKind, TurnPipeline, TurnReport};
use courier::transport::{MailTransport, TransportError};

/// Oracle that replays canned replies in order.
struct ScriptedOracle {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedOracle {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| (*r).to_owned()).collect()),
        }
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
        self.replies
            .lock()
            .expect("reply lock should not be poisoned")
            .pop_front()
            .ok_or_else(|| OracleError::Parse("scripted oracle exhausted".to_owned()))
    }
}

/// Oracle whose every call fails.
struct FailingOracle;

#[async_trait]
impl Oracle for FailingOracle {
    async fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
        Err(OracleError::HttpStatus {
            status: 503,
            body: "model loading".to_owned(),
        })
    }
}

/// Store whose every operation fails.
struct FailingStore;

#[async_trait]
impl ContactStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<ContactRecord>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_owned()))
    }

    async fn put(
        &self,
        _key: &str,
        _record: &ContactRecord,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_owned()))
    }
}

/// History whose every read fails.
struct FailingHistory;

#[async_trait]
impl HistorySource for FailingHistory {
    async fn room_turns(&self, _room_id: Uuid) -> Result<Vec<ConversationTurn>, HistoryError> {
        Err(HistoryError::Unavailable("history offline".to_owned()))
    }
}

/// Transport whose every send is rejected.
struct RejectingTransport;

#[async_trait]
impl MailTransport for RejectingTransport {
    async fn send(&self, _to_email: &str) -> Result<(), TransportError> {
        Err(TransportError::Rejected {
            status: 400,
            body: "bad template".to_owned(),
        })
    }
}

fn make_turn() -> TurnContext {
    TurnContext {
        room_id: Uuid::new_v4(),
        user_id: "visitor".to_owned(),
        text: "hello".to_owned(),
    }
}

fn build_pipeline(
    store: Arc<dyn ContactStore>,
    oracle: Arc<dyn Oracle>,
    history: Arc<dyn HistorySource>,
    transport: Option<Arc<dyn MailTransport>>,
) -> (Arc<ContactBook>, TurnPipeline) {
    let book = Arc::new(ContactBook::new(store, "Courier".to_owned()));
    let pipeline = TurnPipeline::new(
        GuidanceProvider::new(Arc::clone(&book)),
        CompletionEvaluator::new(Arc::clone(&book), Arc::clone(&oracle)),
        MaterialDispatch::new(Arc::clone(&book), oracle, history, transport),
    );
    (book, pipeline)
}

fn failure_ops(report: &TurnReport) -> Vec<(&'static str, &'static str, FailureKind)> {
    report
        .failures
        .iter()
        .map(|f| (f.component, f.operation, f.kind))
        .collect()
}

#[tokio::test]
async fn store_failure_degrades_every_dependent_operation() {
    // The sweep abstains before touching the store, so the three store reads
    // (gate, render, deliver) are the failures; each is caught exactly once.
    let oracle: Arc<dyn Oracle> = Arc::new(ScriptedOracle::new(&["{}"]));
    let history: Arc<dyn HistorySource> = Arc::new(InMemoryHistory::new());
    let (_book, pipeline) = build_pipeline(Arc::new(FailingStore), oracle, history, None);

    let report = pipeline.run_turn(&make_turn()).await;

    assert!(!report.capture_gate);
    assert_eq!(report.capture, None);
    assert_eq!(report.guidance, FALLBACK_GUIDANCE);
    assert_eq!(report.delivery, None);
    assert_eq!(
        failure_ops(&report),
        vec![
            ("evaluator", "should_run", FailureKind::Store),
            ("guidance", "render", FailureKind::Store),
            ("dispatch", "deliver", FailureKind::Store),
        ]
    );
}

#[tokio::test]
async fn oracle_failure_is_reported_per_operation() {
    let store = Arc::new(InMemoryStore::new());
    let oracle: Arc<dyn Oracle> = Arc::new(FailingOracle);
    let history: Arc<dyn HistorySource> = Arc::new(InMemoryHistory::new());
    let (book, pipeline) = build_pipeline(store, oracle, history, None);

    // A complete record opens the gate, so both oracle calls fail.
    book.fill_email("visitor", "a@b.com")
        .await
        .expect("preset fill should succeed");

    let report = pipeline.run_turn(&make_turn()).await;

    assert_eq!(report.sighting, None);
    assert!(report.capture_gate);
    assert_eq!(report.capture, None);
    assert!(report.guidance.contains("a@b.com"), "guidance must still render");
    assert_eq!(report.delivery, Some(DeliveryOutcome::Declined));
    assert_eq!(
        failure_ops(&report),
        vec![
            ("dispatch", "observe", FailureKind::Oracle),
            ("evaluator", "capture", FailureKind::Oracle),
        ]
    );
}

#[tokio::test]
async fn history_failure_only_breaks_the_sweep() {
    let store = Arc::new(InMemoryStore::new());
    let oracle: Arc<dyn Oracle> = Arc::new(ScriptedOracle::new(&[]));
    let history: Arc<dyn HistorySource> = Arc::new(FailingHistory);
    let (_book, pipeline) = build_pipeline(store, oracle, history, None);

    let report = pipeline.run_turn(&make_turn()).await;

    assert_eq!(report.sighting, None);
    assert!(!report.capture_gate, "empty record keeps the gate closed");
    assert!(report.guidance.contains("Missing information"));
    assert_eq!(report.delivery, Some(DeliveryOutcome::Declined));
    assert_eq!(
        failure_ops(&report),
        vec![("dispatch", "observe", FailureKind::History)]
    );
}

#[tokio::test]
async fn transport_failure_degrades_to_no_delivery() {
    let store = Arc::new(InMemoryStore::new());
    let oracle: Arc<dyn Oracle> = Arc::new(ScriptedOracle::new(&["{}", "{}"]));
    let history: Arc<dyn HistorySource> = Arc::new(InMemoryHistory::new());
    let transport: Arc<dyn MailTransport> = Arc::new(RejectingTransport);
    let (book, pipeline) = build_pipeline(store, oracle, history, Some(transport));

    book.record_sighting("visitor", "a@b.com", true)
        .await
        .expect("preset sighting should succeed");

    let report = pipeline.run_turn(&make_turn()).await;

    assert_eq!(report.delivery, None);
    assert_eq!(
        failure_ops(&report),
        vec![("dispatch", "deliver", FailureKind::Transport)]
    );
    // The rest of the turn still completed.
    assert!(report.capture_gate);
    assert!(report.guidance.contains("a@b.com"));
}
