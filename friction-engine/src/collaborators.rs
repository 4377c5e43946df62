//! Narrow traits for the external models, the fix generator and the executor.
//!
//! Implementations return `anyhow::Result` so they can attach their own
//! context; the engine wraps every call in [`crate::guard::guarded`] and turns
//! failures into [`crate::error::CallFailure`] values.

use async_trait::async_trait;

use crate::model::{
    DetectedAnomaly, DetectedFriction, FrictionResolution, PredictionCandidate,
    RecognizedPattern, SessionAnalysis, SolutionRecommendation, WorkflowIssue,
};
use crate::sensors::SensorBundle;

#[async_trait]
pub trait PatternRecognizer: Send + Sync {
    async fn analyze_patterns(&self, bundle: &SensorBundle)
        -> anyhow::Result<Vec<RecognizedPattern>>;
}

#[async_trait]
pub trait AnomalyDetector: Send + Sync {
    async fn detect_anomalies(&self, bundle: &SensorBundle) -> anyhow::Result<Vec<DetectedAnomaly>>;
}

#[async_trait]
pub trait WorkflowAnalyzer: Send + Sync {
    async fn analyze_workflow(
        &self,
        bundle: &SensorBundle,
        patterns: &[RecognizedPattern],
    ) -> anyhow::Result<Vec<WorkflowIssue>>;
}

#[async_trait]
pub trait FrictionPredictor: Send + Sync {
    async fn predict_future_friction(
        &self,
        patterns: &[RecognizedPattern],
        session: &SessionAnalysis,
    ) -> anyhow::Result<Vec<PredictionCandidate>>;
}

/// Produces candidate remedies. Content generation is out of the engine's hands.
#[async_trait]
pub trait SolutionGenerator: Send + Sync {
    async fn generate_solutions(
        &self,
        friction: &DetectedFriction,
    ) -> anyhow::Result<Vec<SolutionRecommendation>>;
}

/// Applies a remedy.
///
/// Returning `Ok` with `success == false` reports a failed attempt the
/// executor handled itself (optionally rolled back); returning `Err` means the
/// attempt could not be carried out at all.
#[async_trait]
pub trait SolutionExecutor: Send + Sync {
    async fn implement_solution(
        &self,
        friction: &DetectedFriction,
        solution: &SolutionRecommendation,
    ) -> anyhow::Result<FrictionResolution>;
}
