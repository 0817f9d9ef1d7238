//! Reconciliation scenarios driven from raw HL7 messages
//!
//! Messages go through the public decode path and are applied one at a time
//! to an in-memory store.

use std::sync::Arc;
use wardsync::adapters::memory::MemoryStore;
use wardsync::adapters::store::{StayStore, VisitHistory};
use wardsync::core::classify::{decode_message, Decoded, Intent};
use wardsync::core::reconcile::{ApplyOutcome, LocationResolver, NoOpReason, ReconciliationEngine};
use wardsync::domain::{MovementId, VisitId};

const VISIT: i64 = 4_223_045_829;

/// Builds an ADT message for the test visit
///
/// `created` is `DDHH` on 2023-01; the movement starts at the same time.
fn adt(trigger: &str, movement: i64, bed: &str, created: &str) -> String {
    let timestamp = format!("202301{created}0000");
    let discharge = if trigger == "A03" { timestamp.as_str() } else { "" };
    format!(
        "MSH|^~\\&|ORBIS|KH|WARDSYNC|KH|{timestamp}||ADT^{trigger}|1|P|2.5\r\
         PID|1|1441645||||Doe^Jane|19700304|F\r\
         PV1|1|I|KAR1^R1^{bed}{}|{VISIT}{}|20230101080000|{discharge}\r\
         ZBE|{movement}|{timestamp}\r",
        "|".repeat(15),
        "|".repeat(24),
    )
}

struct Harness {
    engine: ReconciliationEngine,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let engine = ReconciliationEngine::new(store.clone(), LocationResolver::default());
        Self { engine, store }
    }

    async fn apply(&self, text: String) -> ApplyOutcome {
        let Decoded::Supported(message) = decode_message(&text).unwrap() else {
            panic!("message should be supported");
        };
        self.engine.apply(&message.command).await.unwrap()
    }

    async fn history(&self) -> VisitHistory {
        self.store
            .visit_history(VisitId::new(VISIT))
            .await
            .unwrap()
            .unwrap()
    }
}

#[tokio::test]
async fn test_cancel_transfer_reopens_previous_stay() {
    let h = Harness::new();
    h.apply(adt("A01", 1, "B1", "0108")).await;
    h.apply(adt("A02", 2, "B2", "0210")).await;

    let outcome = h.apply(adt("A12", 2, "B2", "0211")).await;
    assert!(outcome.is_applied());

    let history = h.history().await;
    assert_eq!(history.stays.len(), 1);
    assert_eq!(history.stays[0].movement_id, MovementId::new(1));
    assert!(history.stays[0].is_open());
}

#[tokio::test]
async fn test_discharge_and_cancel_round_trip() {
    let h = Harness::new();
    h.apply(adt("A01", 1, "B1", "0108")).await;
    let stay_id = h.history().await.stays[0].id;

    h.apply(adt("A03", 2, "B1", "0312")).await;
    let discharged = h.history().await;
    assert!(discharged.visit.discharge_date.is_some());
    assert_eq!(discharged.discharges.len(), 1);
    assert_eq!(discharged.open_stays().count(), 0);

    h.apply(adt("A13", 2, "B1", "0313")).await;
    let restored = h.history().await;
    assert_eq!(restored.visit.discharge_date, None);
    assert!(restored.discharges.is_empty());
    assert_eq!(restored.stays.len(), 1);
    assert_eq!(restored.stays[0].id, stay_id);
    assert!(restored.stays[0].is_open());
}

#[tokio::test]
async fn test_cancel_admission_is_idempotent() {
    let h = Harness::new();

    let outcome = h.apply(adt("A11", 1, "B1", "0108")).await;
    assert_eq!(
        outcome,
        ApplyOutcome::NoOp {
            intent: Intent::CancelAdmission,
            reason: NoOpReason::NothingToCancel,
        }
    );

    h.apply(adt("A01", 1, "B1", "0108")).await;
    assert!(h.apply(adt("A11", 1, "B1", "0109")).await.is_applied());
    assert!(h.history().await.stays.is_empty());

    let again = h.apply(adt("A11", 1, "B1", "0110")).await;
    assert!(!again.is_applied());
    assert_eq!(h.store.stay_count().await, 0);
}

#[tokio::test]
async fn test_admission_without_bed_creates_no_stay() {
    let h = Harness::new();

    let outcome = h.apply(adt("A01", 1, "", "0108")).await;
    assert!(!outcome.is_applied());
    assert_eq!(h.store.stay_count().await, 0);
}

#[tokio::test]
async fn test_single_open_stay_over_lifecycle() {
    let h = Harness::new();
    let sequence = [
        adt("A01", 1, "B1", "0108"),
        adt("A02", 2, "B2", "0210"),
        adt("A02", 3, "B3", "0310"),
        adt("A12", 3, "B3", "0311"),
        adt("A08", 4, "B9", "0312"),
        adt("A03", 5, "B2", "0412"),
        adt("A13", 5, "B2", "0413"),
    ];

    for message in sequence {
        h.apply(message).await;
        assert!(h.history().await.open_stays().count() <= 1);
    }

    let history = h.history().await;
    assert_eq!(history.open_stays().count(), 1);
    assert_eq!(history.open_stays().next().unwrap().bed_id.as_str(), "B2");
}
