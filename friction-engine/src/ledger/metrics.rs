//! Aggregate counters folded from ledger records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::store::{LedgerRecord, PatternOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub attempts: u64,
    pub successes: u64,
}

impl OutcomeTally {
    fn record(&mut self, success: bool) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        }
    }

    pub fn success_rate(&self) -> Option<f64> {
        (self.attempts > 0).then(|| self.successes as f64 / self.attempts as f64)
    }
}

/// Detection and resolution counters. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrictionMetrics {
    pub detection_times_ms: Vec<u64>,
    pub resolution_times_ms: Vec<u64>,
    /// Keyed by solution type.
    pub solution_outcomes: BTreeMap<String, OutcomeTally>,
    /// Latest reported confidence per pattern id.
    pub pattern_accuracy: BTreeMap<String, f64>,
    pub total_frictions: u64,
    pub resolved_frictions: u64,
    pub failed_resolutions: u64,
}

impl FrictionMetrics {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a LedgerRecord>) -> Self {
        let mut metrics = Self::default();
        for record in records {
            metrics.apply(record);
        }
        metrics
    }

    pub fn apply(&mut self, record: &LedgerRecord) {
        match record {
            LedgerRecord::Detection(detection) => {
                self.detection_times_ms.push(detection.elapsed_ms);
                self.total_frictions += detection.frictions.len() as u64;
            }
            LedgerRecord::Resolution(entry) => {
                let resolution = &entry.resolution;
                self.resolution_times_ms.push(resolution.time_taken_ms);
                self.solution_outcomes
                    .entry(resolution.implementation_type.to_string())
                    .or_default()
                    .record(resolution.success);
                if resolution.success {
                    self.resolved_frictions += 1;
                } else {
                    self.failed_resolutions += 1;
                }
            }
            LedgerRecord::PatternFeedback(feedback) => {
                if let (PatternOutcome::Observed, Some(confidence)) =
                    (feedback.outcome, feedback.confidence)
                {
                    self.pattern_accuracy
                        .insert(feedback.pattern_id.clone(), confidence);
                }
            }
        }
    }

    pub fn success_rate(&self, solution_type: &str) -> Option<f64> {
        self.solution_outcomes
            .get(solution_type)
            .and_then(OutcomeTally::success_rate)
    }

    pub fn success_rates(&self) -> BTreeMap<String, f64> {
        self.solution_outcomes
            .iter()
            .filter_map(|(ty, tally)| tally.success_rate().map(|rate| (ty.clone(), rate)))
            .collect()
    }

    pub fn mean_detection_time_ms(&self) -> Option<f64> {
        mean(&self.detection_times_ms)
    }

    pub fn mean_resolution_time_ms(&self) -> Option<f64> {
        mean(&self.resolution_times_ms)
    }
}

/// Observation and outcome counts for one pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternCalibration {
    pub observations: u64,
    pub latest_confidence: Option<f64>,
    pub resolutions: OutcomeTally,
}

impl PatternCalibration {
    pub fn apply(&mut self, outcome: PatternOutcome, confidence: Option<f64>) {
        match outcome {
            PatternOutcome::Observed => {
                self.observations += 1;
                if confidence.is_some() {
                    self.latest_confidence = confidence;
                }
            }
            PatternOutcome::Resolved => self.resolutions.record(true),
            PatternOutcome::ResolutionFailed => self.resolutions.record(false),
        }
    }

    /// Share of resolution attempts on this pattern's frictions that succeeded.
    pub fn resolution_success_rate(&self) -> Option<f64> {
        self.resolutions.success_rate()
    }
}

fn mean(samples: &[u64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<u64>() as f64 / samples.len() as f64)
}
