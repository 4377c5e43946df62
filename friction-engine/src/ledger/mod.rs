//! Outcome ledger: append-only history of detections, resolutions and
//! pattern feedback, plus the counters folded from it.
//!
//! Every record is applied to the in-process [`LedgerSummary`] first and
//! then handed to storage. A storage failure is logged and never propagates.

pub mod metrics;
pub mod store;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{DetectedFriction, FrictionResolution, RecognizedPattern};

pub use metrics::{FrictionMetrics, OutcomeTally, PatternCalibration};
pub use store::{
    DetectionRecord, InMemoryLedgerStorage, JsonlLedgerStorage, LedgerRecord, LedgerStorage,
    PatternFeedback, PatternOutcome, ResolutionRecord,
};

/// Metrics plus per-pattern calibration, derivable from any record sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub metrics: FrictionMetrics,
    pub patterns: BTreeMap<String, PatternCalibration>,
}

impl LedgerSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a LedgerRecord>) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.apply(record);
        }
        summary
    }

    pub fn apply(&mut self, record: &LedgerRecord) {
        self.metrics.apply(record);
        if let LedgerRecord::PatternFeedback(feedback) = record {
            self.patterns
                .entry(feedback.pattern_id.clone())
                .or_default()
                .apply(feedback.outcome, feedback.confidence);
        }
    }
}

pub struct OutcomeLedger {
    storage: Arc<dyn LedgerStorage>,
    summary: Mutex<LedgerSummary>,
}

impl OutcomeLedger {
    pub fn new(storage: Arc<dyn LedgerStorage>) -> Self {
        Self {
            storage,
            summary: Mutex::new(LedgerSummary::default()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryLedgerStorage::new()))
    }

    /// Record one detection run. Called for cancelled runs too, so detection
    /// timing covers every run.
    pub async fn store_detection(
        &self,
        session_id: Uuid,
        frictions: &[DetectedFriction],
        detection_quality: f64,
        elapsed: Duration,
        cancelled: bool,
    ) {
        let record = LedgerRecord::Detection(DetectionRecord {
            recorded_at: Utc::now(),
            session_id,
            elapsed_ms: elapsed.as_millis() as u64,
            detection_quality,
            cancelled,
            frictions: frictions.to_vec(),
        });
        self.record(record).await;
    }

    /// Record an attempt and, for pattern-derived frictions, its calibration outcome.
    pub async fn store_resolution(
        &self,
        friction: &DetectedFriction,
        resolution: &FrictionResolution,
    ) {
        self.record(LedgerRecord::Resolution(ResolutionRecord {
            recorded_at: Utc::now(),
            friction_id: friction.id,
            friction_type: friction.friction_type.clone(),
            pattern_id: friction.pattern_id.clone(),
            resolution: resolution.clone(),
        }))
        .await;

        if let Some(pattern_id) = &friction.pattern_id {
            let outcome = if resolution.success {
                PatternOutcome::Resolved
            } else {
                PatternOutcome::ResolutionFailed
            };
            self.store_pattern_feedback(pattern_id, outcome, None, Some(friction.id))
                .await;
        }
    }

    pub async fn store_pattern_feedback(
        &self,
        pattern_id: &str,
        outcome: PatternOutcome,
        confidence: Option<f64>,
        friction_id: Option<Uuid>,
    ) {
        self.record(LedgerRecord::PatternFeedback(PatternFeedback {
            recorded_at: Utc::now(),
            pattern_id: pattern_id.to_string(),
            outcome,
            confidence,
            friction_id,
        }))
        .await;
    }

    /// One `observed` feedback per distinct pattern id.
    pub async fn observe_patterns(&self, patterns: &[RecognizedPattern]) {
        let mut seen = BTreeSet::new();
        for pattern in patterns {
            if seen.insert(pattern.id.as_str()) {
                self.store_pattern_feedback(
                    &pattern.id,
                    PatternOutcome::Observed,
                    Some(pattern.confidence),
                    None,
                )
                .await;
            }
        }
    }

    pub async fn metrics(&self) -> FrictionMetrics {
        self.summary.lock().await.metrics.clone()
    }

    pub async fn pattern_calibration(&self, pattern_id: &str) -> Option<PatternCalibration> {
        self.summary.lock().await.patterns.get(pattern_id).cloned()
    }

    pub async fn summary(&self) -> LedgerSummary {
        self.summary.lock().await.clone()
    }

    async fn record(&self, record: LedgerRecord) {
        self.summary.lock().await.apply(&record);
        match self.storage.append(&record).await {
            Ok(()) => debug!(kind = record_kind(&record), "Ledger record appended"),
            Err(e) => warn!(kind = record_kind(&record), error = %e, "Ledger append failed"),
        }
    }
}

impl std::fmt::Debug for OutcomeLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeLedger").finish_non_exhaustive()
    }
}

fn record_kind(record: &LedgerRecord) -> &'static str {
    match record {
        LedgerRecord::Detection(_) => "detection",
        LedgerRecord::Resolution(_) => "resolution",
        LedgerRecord::PatternFeedback(_) => "pattern_feedback",
    }
}
