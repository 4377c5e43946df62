//! JSON reports printed by the agent.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use friction_engine::{
    DetectionReport, FrictionMetrics, GateReport, LedgerRecord, LedgerSummary, PatternCalibration,
    SessionOutcome,
};
use serde::{Deserialize, Serialize};

/// Outcome of one replayed session plus the ledger counters after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub generated_at: DateTime<Utc>,
    pub detection: DetectionReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateReport>,
    /// Non-fatal failures from detection and the gate, in order.
    pub failures: Vec<String>,
    pub metrics: FrictionMetrics,
}

impl SessionReport {
    pub fn new(outcome: SessionOutcome, metrics: FrictionMetrics) -> Self {
        let gate_failures = outcome.gate.iter().flat_map(|g| g.failures.iter());
        let failures = outcome
            .detection
            .failures
            .iter()
            .chain(gate_failures)
            .map(ToString::to_string)
            .collect();
        Self {
            generated_at: Utc::now(),
            detection: outcome.detection,
            gate: outcome.gate,
            failures,
            metrics,
        }
    }
}

/// Summary of a persisted ledger file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerReport {
    pub records: usize,
    pub detections: usize,
    pub resolutions: usize,
    pub pattern_feedback: usize,
    pub total_frictions: u64,
    pub resolved_frictions: u64,
    pub failed_resolutions: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_detection_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_resolution_time_ms: Option<f64>,
    /// Keyed by solution type.
    pub success_rates: BTreeMap<String, f64>,
    pub patterns: BTreeMap<String, PatternCalibration>,
    /// Mean relative improvement per measured metric.
    pub measured_improvement: BTreeMap<String, f64>,
}

impl LedgerReport {
    pub fn from_records(records: &[LedgerRecord]) -> Self {
        let summary = LedgerSummary::from_records(records);
        let mut report = Self {
            records: records.len(),
            total_frictions: summary.metrics.total_frictions,
            resolved_frictions: summary.metrics.resolved_frictions,
            failed_resolutions: summary.metrics.failed_resolutions,
            mean_detection_time_ms: summary.metrics.mean_detection_time_ms(),
            mean_resolution_time_ms: summary.metrics.mean_resolution_time_ms(),
            success_rates: summary.metrics.success_rates(),
            patterns: summary.patterns,
            ..Self::default()
        };

        let mut improvements: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for record in records {
            match record {
                LedgerRecord::Detection(_) => report.detections += 1,
                LedgerRecord::PatternFeedback(_) => report.pattern_feedback += 1,
                LedgerRecord::Resolution(entry) => {
                    report.resolutions += 1;
                    if let Some(impact) = &entry.resolution.impact_measurement {
                        improvements
                            .entry(impact.metric.clone())
                            .or_default()
                            .push(impact.improvement());
                    }
                }
            }
        }
        report.measured_improvement = improvements
            .into_iter()
            .map(|(metric, values)| {
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                (metric, mean)
            })
            .collect();
        report
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use friction_engine::ledger::ResolutionRecord;
    use friction_engine::{FrictionResolution, FrictionType, ImpactMeasurement, SolutionType};
    use uuid::Uuid;

    use super::*;

    fn resolution(success: bool, impact: Option<ImpactMeasurement>) -> LedgerRecord {
        let mut resolution = if success {
            FrictionResolution::succeeded(
                Uuid::new_v4(),
                Uuid::new_v4(),
                SolutionType::Automation,
                Duration::from_millis(200),
            )
        } else {
            FrictionResolution::failed(
                Uuid::new_v4(),
                Uuid::new_v4(),
                SolutionType::Automation,
                Duration::from_millis(400),
                true,
            )
        };
        resolution.impact_measurement = impact;
        LedgerRecord::Resolution(ResolutionRecord {
            recorded_at: Utc::now(),
            friction_id: resolution.friction_id,
            friction_type: FrictionType::PerformanceBottleneck,
            pattern_id: None,
            resolution,
        })
    }

    #[test]
    fn ledger_report_counts_records_and_rates() {
        let build_time = |observed| ImpactMeasurement {
            metric: "build_secs".into(),
            baseline: 100.0,
            observed,
        };
        let records = vec![
            resolution(true, Some(build_time(50.0))),
            resolution(true, Some(build_time(70.0))),
            resolution(false, None),
        ];

        let report = LedgerReport::from_records(&records);
        assert_eq!(report.records, 3);
        assert_eq!(report.resolutions, 3);
        assert_eq!(report.detections, 0);
        assert_eq!(report.resolved_frictions, 2);
        assert_eq!(report.failed_resolutions, 1);
        assert!((report.success_rates["automation"] - 2.0 / 3.0).abs() < 1e-9);
        assert!((report.measured_improvement["build_secs"] - 0.4).abs() < 1e-9);
        let mean = report.mean_resolution_time_ms.unwrap();
        assert!((mean - 800.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_ledger_has_no_means() {
        let report = LedgerReport::from_records(&[]);
        assert_eq!(report.records, 0);
        assert!(report.mean_detection_time_ms.is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("mean_detection_time_ms").is_none());
    }
}
