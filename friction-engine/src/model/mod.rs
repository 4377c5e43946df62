//! Data model shared by every stage of the friction pipeline.

pub mod friction;
pub mod inputs;
pub mod resolution;
pub mod solution;

pub use friction::{
    DetectedFriction, FrictionCategory, FrictionContext, FrictionRisk, FrictionSource,
    FrictionStatus, FrictionTrend, FrictionType, FuturePrediction, TrendDirection,
};
pub use inputs::{
    DetectedAnomaly, PredictionCandidate, RecognizedPattern, SessionAnalysis, WorkflowIssue,
};
pub use resolution::{FrictionResolution, ImpactMeasurement};
pub use solution::{RiskLevel, RoiEstimate, SolutionRecommendation, SolutionType};

/// Clamp a score into `[0, 1]`. NaN becomes 0; infinities saturate.
pub fn unit_interval(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
