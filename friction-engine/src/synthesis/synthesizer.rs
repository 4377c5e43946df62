//! Turns external candidates into normalized [`DetectedFriction`] records.
//!
//! | Path      | Admits                         | Type                    | Status    |
//! |-----------|--------------------------------|-------------------------|-----------|
//! | pattern   | one per typical-friction tag   | the tag                 | detected  |
//! | workflow  | every issue                    | workflow_inefficiency   | detected  |
//! | anomaly   | severity > threshold           | performance_anomaly     | detected  |
//! | predicted | confidence > threshold         | candidate's type        | predicted |

use std::time::Duration;

use crate::config::SynthesisThresholds;
use crate::model::{
    DetectedAnomaly, DetectedFriction, FrictionCategory, FrictionContext, FrictionRisk,
    FrictionSource, FrictionStatus, FrictionTrend, FrictionType, FuturePrediction,
    PredictionCandidate, RecognizedPattern, TrendDirection, WorkflowIssue,
};

use super::context::scoped;

/// Horizon of a pattern-derived prediction before frequency shortens it.
const PREDICTION_HORIZON: Duration = Duration::from_secs(24 * 60 * 60);
/// A friction occurring every time is still expected no sooner than this share of the horizon.
const MIN_HORIZON_SHARE: f64 = 0.05;
/// Per-sample frequency change below which a trend counts as stable.
const TREND_EPSILON: f64 = 0.01;

/// Everything the four synthesis paths consume.
#[derive(Debug, Default, Clone, Copy)]
pub struct SynthesisInputs<'a> {
    pub patterns: &'a [RecognizedPattern],
    pub workflow_issues: &'a [WorkflowIssue],
    pub anomalies: &'a [DetectedAnomaly],
    pub predictions: &'a [PredictionCandidate],
}

#[derive(Debug, Clone, Default)]
pub struct FrictionSynthesizer {
    thresholds: SynthesisThresholds,
}

impl FrictionSynthesizer {
    pub fn new(thresholds: SynthesisThresholds) -> Self {
        Self { thresholds }
    }

    /// All four paths in discovery order: patterns, workflow, anomalies, predictions.
    pub fn synthesize(
        &self,
        inputs: SynthesisInputs<'_>,
        base: &FrictionContext,
    ) -> Vec<DetectedFriction> {
        let mut frictions = self.from_patterns(inputs.patterns, base);
        frictions.extend(self.from_workflow_issues(inputs.workflow_issues, base));
        frictions.extend(self.from_anomalies(inputs.anomalies, base));
        frictions.extend(self.from_predictions(inputs.predictions, base));
        frictions
    }

    pub fn from_patterns(
        &self,
        patterns: &[RecognizedPattern],
        base: &FrictionContext,
    ) -> Vec<DetectedFriction> {
        let mut frictions = Vec::new();
        for pattern in patterns {
            let context = scoped(base, &pattern.affected_files);
            for tag in &pattern.typical_friction {
                let impact = (pattern.friction_severity * pattern.frequency).min(1.0);
                let description = if pattern.description.is_empty() {
                    pattern.name.clone()
                } else {
                    pattern.description.clone()
                };
                let mut friction = DetectedFriction::new(
                    tag.clone(),
                    FrictionSource::Pattern,
                    pattern.friction_severity,
                    pattern.frequency,
                    impact,
                )
                .with_description(description)
                .with_context(context.clone())
                .with_pattern(pattern.id.clone())
                .with_prediction(pattern_prediction(pattern));
                if let Some(trend) = frequency_trend(&pattern.frequency_history) {
                    friction = friction.with_trend(trend);
                }
                let risk = assess_risk(&friction, pattern.confidence);
                frictions.push(friction.with_risk(risk));
            }
        }
        frictions
    }

    pub fn from_workflow_issues(
        &self,
        issues: &[WorkflowIssue],
        base: &FrictionContext,
    ) -> Vec<DetectedFriction> {
        issues
            .iter()
            .map(|issue| {
                DetectedFriction::new(
                    FrictionType::WorkflowInefficiency,
                    FrictionSource::Workflow,
                    issue.severity,
                    issue.frequency,
                    issue.productivity_impact,
                )
                .with_category(FrictionCategory::Workflow)
                .with_description(issue.description.clone())
                .with_context(scoped(base, &issue.affected_files))
                .with_time_wasted(Duration::from_secs(issue.estimated_time_waste_secs))
            })
            .collect()
    }

    pub fn from_anomalies(
        &self,
        anomalies: &[DetectedAnomaly],
        base: &FrictionContext,
    ) -> Vec<DetectedFriction> {
        anomalies
            .iter()
            .filter(|a| a.severity > self.thresholds.significant_anomaly_severity)
            .map(|anomaly| {
                let description = if anomaly.description.is_empty() {
                    anomaly.anomaly_type.clone()
                } else {
                    anomaly.description.clone()
                };
                DetectedFriction::new(
                    FrictionType::PerformanceAnomaly,
                    FrictionSource::Anomaly,
                    anomaly.severity,
                    0.0,
                    anomaly.impact_score,
                )
                .with_category(FrictionCategory::Performance)
                .with_description(description)
                .with_context(scoped(base, &anomaly.affected_files))
            })
            .collect()
    }

    pub fn from_predictions(
        &self,
        predictions: &[PredictionCandidate],
        base: &FrictionContext,
    ) -> Vec<DetectedFriction> {
        predictions
            .iter()
            .filter(|p| p.confidence > self.thresholds.min_prediction_confidence)
            .map(|prediction| {
                let category = prediction
                    .category
                    .clone()
                    .unwrap_or_else(|| FrictionCategory::for_type(&prediction.friction_type));
                DetectedFriction::new(
                    prediction.friction_type.clone(),
                    FrictionSource::Prediction,
                    prediction.severity,
                    prediction.frequency,
                    prediction.estimated_impact,
                )
                .with_category(category)
                .with_description(prediction.description.clone())
                .with_context(base.clone())
                .with_status(FrictionStatus::Predicted)
                .with_prediction(FuturePrediction {
                    confidence: prediction.confidence,
                    time_to_occurrence_secs: prediction.time_to_occurrence_secs,
                    prevention: prediction.prevention_strategies.clone(),
                })
            })
            .collect()
    }
}

/// Frequent patterns recur sooner.
fn pattern_prediction(pattern: &RecognizedPattern) -> FuturePrediction {
    let share = (1.0 - pattern.frequency.clamp(0.0, 1.0)).max(MIN_HORIZON_SHARE);
    FuturePrediction {
        confidence: pattern.confidence.clamp(0.0, 1.0),
        time_to_occurrence_secs: (PREDICTION_HORIZON.as_secs_f64() * share).round() as u64,
        prevention: pattern.prevention_tips.clone(),
    }
}

/// Average per-sample change across the history. Needs two samples.
fn frequency_trend(history: &[f64]) -> Option<FrictionTrend> {
    let (first, last) = match history {
        [first, .., last] => (*first, *last),
        _ => return None,
    };
    let velocity = (last - first) / (history.len() - 1) as f64;
    let direction = if velocity > TREND_EPSILON {
        TrendDirection::Increasing
    } else if velocity < -TREND_EPSILON {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };
    Some(FrictionTrend {
        direction,
        velocity,
        samples: history.len(),
    })
}

/// Risk derived from the friction itself. Low pattern confidence raises the
/// technical risk of acting on it.
fn assess_risk(friction: &DetectedFriction, pattern_confidence: f64) -> FrictionRisk {
    let confidence = pattern_confidence.clamp(0.0, 1.0);
    let customer_impact = if friction.category == FrictionCategory::Performance {
        friction.severity
    } else {
        friction.severity * 0.5
    };
    FrictionRisk {
        business_impact: friction.developer_impact,
        technical_risk: friction.severity * (1.0 - confidence),
        team_morale_impact: friction.frequency * friction.severity,
        customer_impact,
    }
}
