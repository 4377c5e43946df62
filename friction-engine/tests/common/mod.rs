//! Hand-written collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use friction_engine::{
    AnomalyDetector, DetectedAnomaly, DetectedFriction, FrictionPredictor, FrictionResolution,
    PatternRecognizer, PredictionCandidate, RecognizedPattern, RiskLevel, Sensor, SensorBundle,
    SensorReading, SessionAnalysis, SolutionExecutor, SolutionGenerator, SolutionRecommendation,
    SolutionType, WorkflowAnalyzer, WorkflowIssue,
};
use tokio_util::sync::CancellationToken;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("friction_engine=debug")
        .with_test_writer()
        .try_init();
}

pub fn session() -> SessionAnalysis {
    SessionAnalysis::new("dana", "atlas").with_working_directory("/src/atlas")
}

pub struct StaticSensor {
    pub name: &'static str,
    pub reading: SensorReading,
}

impl StaticSensor {
    pub fn build(average_build_secs: f64) -> Arc<dyn Sensor> {
        Arc::new(Self {
            name: "build_performance",
            reading: SensorReading::BuildPerformance {
                average_build_secs,
                build_failures: 0,
                cache_hit_rate: 0.5,
                dependency_resolution_secs: 3.0,
            },
        })
    }
}

#[async_trait]
impl Sensor for StaticSensor {
    fn name(&self) -> &str {
        self.name
    }

    async fn collect(&self, _session: &SessionAnalysis) -> anyhow::Result<SensorReading> {
        Ok(self.reading.clone())
    }
}

pub struct FailingSensor(pub &'static str);

#[async_trait]
impl Sensor for FailingSensor {
    fn name(&self) -> &str {
        self.0
    }

    async fn collect(&self, _session: &SessionAnalysis) -> anyhow::Result<SensorReading> {
        anyhow::bail!("{} sensor crashed", self.0)
    }
}

/// Returns its patterns, or fails when built with `failing`.
pub struct FixedPatterns(pub Option<Vec<RecognizedPattern>>);

impl FixedPatterns {
    pub fn failing() -> Self {
        Self(None)
    }
}

#[async_trait]
impl PatternRecognizer for FixedPatterns {
    async fn analyze_patterns(
        &self,
        _bundle: &SensorBundle,
    ) -> anyhow::Result<Vec<RecognizedPattern>> {
        self.0
            .clone()
            .ok_or_else(|| anyhow::anyhow!("pattern model unavailable"))
    }
}

pub struct FixedAnomalies(pub Option<Vec<DetectedAnomaly>>);

#[async_trait]
impl AnomalyDetector for FixedAnomalies {
    async fn detect_anomalies(&self, _bundle: &SensorBundle) -> anyhow::Result<Vec<DetectedAnomaly>> {
        self.0
            .clone()
            .ok_or_else(|| anyhow::anyhow!("anomaly model unavailable"))
    }
}

pub struct FixedWorkflow(pub Vec<WorkflowIssue>);

#[async_trait]
impl WorkflowAnalyzer for FixedWorkflow {
    async fn analyze_workflow(
        &self,
        _bundle: &SensorBundle,
        _patterns: &[RecognizedPattern],
    ) -> anyhow::Result<Vec<WorkflowIssue>> {
        Ok(self.0.clone())
    }
}

pub struct FixedPredictions(pub Vec<PredictionCandidate>);

#[async_trait]
impl FrictionPredictor for FixedPredictions {
    async fn predict_future_friction(
        &self,
        _patterns: &[RecognizedPattern],
        _session: &SessionAnalysis,
    ) -> anyhow::Result<Vec<PredictionCandidate>> {
        Ok(self.0.clone())
    }
}

/// Cancels the run from inside a model call, then never returns.
pub struct CancelsRun(pub CancellationToken);

#[async_trait]
impl AnomalyDetector for CancelsRun {
    async fn detect_anomalies(&self, _bundle: &SensorBundle) -> anyhow::Result<Vec<DetectedAnomaly>> {
        self.0.cancel();
        std::future::pending().await
    }
}

#[async_trait]
impl FrictionPredictor for CancelsRun {
    async fn predict_future_friction(
        &self,
        _patterns: &[RecognizedPattern],
        _session: &SessionAnalysis,
    ) -> anyhow::Result<Vec<PredictionCandidate>> {
        std::future::pending().await
    }
}

pub fn safe_solution() -> SolutionRecommendation {
    SolutionRecommendation::new(SolutionType::Automation, 0.9, RiskLevel::Low)
        .with_title("cache build artifacts")
        .with_reversibility(0.9)
        .auto_implementable(true)
        .with_timing(Duration::from_secs(3600), Duration::from_secs(1800))
}

/// One safe automation remedy for every friction.
pub struct SafeSolutions;

#[async_trait]
impl SolutionGenerator for SafeSolutions {
    async fn generate_solutions(
        &self,
        _friction: &DetectedFriction,
    ) -> anyhow::Result<Vec<SolutionRecommendation>> {
        Ok(vec![safe_solution()])
    }
}

/// Records every call and concurrent use of each affected file.
#[derive(Default)]
pub struct RecordingExecutor {
    pub fail_for: Mutex<Option<uuid::Uuid>>,
    pub delay: Duration,
    pub calls: AtomicUsize,
    pub executed: Mutex<Vec<uuid::Uuid>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    files_in_use: Mutex<HashMap<String, usize>>,
    pub file_overlaps: AtomicUsize,
}

impl RecordingExecutor {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing_for(self, friction_id: uuid::Uuid) -> Self {
        *self.fail_for.lock().unwrap() = Some(friction_id);
        self
    }

    fn enter(&self, files: &[String]) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let mut in_use = self.files_in_use.lock().unwrap();
        for file in files {
            let count = in_use.entry(file.clone()).or_default();
            *count += 1;
            if *count > 1 {
                self.file_overlaps.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn leave(&self, files: &[String]) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut in_use = self.files_in_use.lock().unwrap();
        for file in files {
            if let Some(count) = in_use.get_mut(file) {
                *count -= 1;
            }
        }
    }
}

#[async_trait]
impl SolutionExecutor for RecordingExecutor {
    async fn implement_solution(
        &self,
        friction: &DetectedFriction,
        solution: &SolutionRecommendation,
    ) -> anyhow::Result<FrictionResolution> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.executed.lock().unwrap().push(solution.id);
        self.enter(&solution.affected_files);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.leave(&solution.affected_files);

        if *self.fail_for.lock().unwrap() == Some(friction.id) {
            anyhow::bail!("remedy script exited with status 1");
        }
        Ok(FrictionResolution::succeeded(
            friction.id,
            solution.id,
            solution.solution_type.clone(),
            self.delay,
        ))
    }
}
