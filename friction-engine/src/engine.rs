//! The friction engine: collect → synthesize → rank → evaluate → gate.
//!
//! Phases run one after another. Inside a phase every external call is
//! guarded by its own timeout and the run's cancellation token; a failed
//! call degrades that phase to an empty result and the run continues.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::collaborators::{
    AnomalyDetector, FrictionPredictor, PatternRecognizer, SolutionExecutor, SolutionGenerator,
    WorkflowAnalyzer,
};
use crate::config::EngineConfig;
use crate::error::{FrictionError, FrictionResult, PipelinePhase};
use crate::evaluation::SolutionEvaluator;
use crate::gate::{GateReport, GateVerdict, ResolutionGate};
use crate::guard::guarded;
use crate::ledger::{FrictionMetrics, InMemoryLedgerStorage, LedgerStorage, OutcomeLedger};
use crate::model::{DetectedFriction, RecognizedPattern, SessionAnalysis};
use crate::ranking::rank;
use crate::sensors::{Sensor, SensorAggregator, SensorRegistry};
use crate::synthesis::{base_context, FrictionSynthesizer, SynthesisInputs};

/// Score reported when a run has nothing to judge detection quality by.
const NEUTRAL_DETECTION_QUALITY: f64 = 0.5;

/// Result of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub session_id: Uuid,
    /// Ranked, highest priority first.
    pub frictions: Vec<DetectedFriction>,
    pub sensors_collected: Vec<String>,
    pub sensors_missing: Vec<String>,
    pub patterns_found: usize,
    pub workflow_issues_found: usize,
    pub anomalies_found: usize,
    pub predictions_found: usize,
    pub degraded_phases: Vec<PipelinePhase>,
    pub detection_quality: f64,
    pub elapsed_ms: u64,
    pub cancelled: bool,
    /// Non-fatal failures in the order they occurred.
    #[serde(skip)]
    pub failures: Vec<FrictionError>,
}

/// Detection plus the gate pass that followed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub detection: DetectionReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateReport>,
}

#[derive(Default)]
pub struct FrictionEngineBuilder {
    config: EngineConfig,
    sensors: SensorRegistry,
    pattern_recognizer: Option<Arc<dyn PatternRecognizer>>,
    workflow_analyzer: Option<Arc<dyn WorkflowAnalyzer>>,
    anomaly_detector: Option<Arc<dyn AnomalyDetector>>,
    predictor: Option<Arc<dyn FrictionPredictor>>,
    solution_generator: Option<Arc<dyn SolutionGenerator>>,
    executor: Option<Arc<dyn SolutionExecutor>>,
    ledger_storage: Option<Arc<dyn LedgerStorage>>,
}

impl FrictionEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sensor(mut self, sensor: Arc<dyn Sensor>) -> Self {
        self.sensors.register(sensor);
        self
    }

    pub fn sensors(mut self, sensors: impl IntoIterator<Item = Arc<dyn Sensor>>) -> Self {
        for sensor in sensors {
            self.sensors.register(sensor);
        }
        self
    }

    pub fn pattern_recognizer(mut self, recognizer: Arc<dyn PatternRecognizer>) -> Self {
        self.pattern_recognizer = Some(recognizer);
        self
    }

    pub fn workflow_analyzer(mut self, analyzer: Arc<dyn WorkflowAnalyzer>) -> Self {
        self.workflow_analyzer = Some(analyzer);
        self
    }

    pub fn anomaly_detector(mut self, detector: Arc<dyn AnomalyDetector>) -> Self {
        self.anomaly_detector = Some(detector);
        self
    }

    pub fn predictor(mut self, predictor: Arc<dyn FrictionPredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn solution_generator(mut self, generator: Arc<dyn SolutionGenerator>) -> Self {
        self.solution_generator = Some(generator);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn SolutionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Defaults to in-memory storage.
    pub fn ledger_storage(mut self, storage: Arc<dyn LedgerStorage>) -> Self {
        self.ledger_storage = Some(storage);
        self
    }

    /// Fails with [`FrictionError::Configuration`] when no sensor or executor
    /// is wired or the configuration does not validate.
    pub fn build(self) -> FrictionResult<FrictionEngine> {
        self.config.validate()?;
        if self.sensors.is_empty() {
            return Err(FrictionError::configuration("no sensors registered"));
        }
        let executor = self
            .executor
            .ok_or_else(|| FrictionError::configuration("no solution executor wired"))?;

        let storage = self
            .ledger_storage
            .unwrap_or_else(|| Arc::new(InMemoryLedgerStorage::new()));
        let ledger = Arc::new(OutcomeLedger::new(storage));
        let config = self.config;

        let evaluator = self.solution_generator.map(|generator| {
            SolutionEvaluator::new(
                generator,
                config.solution_timeout(),
                config.recurrences_per_week,
            )
        });
        let gate = ResolutionGate::new(
            executor,
            Arc::clone(&ledger),
            config.policy.clone(),
            config.execution_timeout(),
            config.max_concurrent_resolutions,
        );

        info!(
            sensors = self.sensors.len(),
            pattern_recognizer = self.pattern_recognizer.is_some(),
            workflow_analyzer = self.workflow_analyzer.is_some(),
            anomaly_detector = self.anomaly_detector.is_some(),
            predictor = self.predictor.is_some(),
            solution_generator = evaluator.is_some(),
            "Friction engine built"
        );

        Ok(FrictionEngine {
            aggregator: SensorAggregator::new(self.sensors, config.sensor_timeout()),
            synthesizer: FrictionSynthesizer::new(config.synthesis.clone()),
            pattern_recognizer: self.pattern_recognizer,
            workflow_analyzer: self.workflow_analyzer,
            anomaly_detector: self.anomaly_detector,
            predictor: self.predictor,
            evaluator,
            gate,
            ledger,
            config,
        })
    }
}

pub struct FrictionEngine {
    config: EngineConfig,
    aggregator: SensorAggregator,
    synthesizer: FrictionSynthesizer,
    pattern_recognizer: Option<Arc<dyn PatternRecognizer>>,
    workflow_analyzer: Option<Arc<dyn WorkflowAnalyzer>>,
    anomaly_detector: Option<Arc<dyn AnomalyDetector>>,
    predictor: Option<Arc<dyn FrictionPredictor>>,
    evaluator: Option<SolutionEvaluator>,
    gate: ResolutionGate,
    ledger: Arc<OutcomeLedger>,
}

impl FrictionEngine {
    pub fn builder() -> FrictionEngineBuilder {
        FrictionEngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<OutcomeLedger> {
        &self.ledger
    }

    pub async fn metrics(&self) -> FrictionMetrics {
        self.ledger.metrics().await
    }

    /// Detect, synthesize, rank and evaluate frictions for one session.
    ///
    /// Never fails. Sensor and phase failures, timeouts and cancellation
    /// leave their mark in the report and the run keeps whatever settled.
    pub async fn detect(
        &self,
        session: &SessionAnalysis,
        cancel: &CancellationToken,
    ) -> DetectionReport {
        let start = Instant::now();
        let mut failures = Vec::new();
        let mut degraded_phases = Vec::new();

        let bundle = self
            .aggregator
            .collect(Arc::new(session.clone()), cancel)
            .await;

        let patterns = match &self.pattern_recognizer {
            Some(model) => {
                self.phase(
                    PipelinePhase::PatternRecognition,
                    cancel,
                    model.analyze_patterns(&bundle),
                    &mut failures,
                    &mut degraded_phases,
                )
                .await
            }
            None => Vec::new(),
        };
        let workflow_issues = match &self.workflow_analyzer {
            Some(model) => {
                self.phase(
                    PipelinePhase::WorkflowAnalysis,
                    cancel,
                    model.analyze_workflow(&bundle, &patterns),
                    &mut failures,
                    &mut degraded_phases,
                )
                .await
            }
            None => Vec::new(),
        };
        let anomalies = match &self.anomaly_detector {
            Some(model) => {
                self.phase(
                    PipelinePhase::AnomalyDetection,
                    cancel,
                    model.detect_anomalies(&bundle),
                    &mut failures,
                    &mut degraded_phases,
                )
                .await
            }
            None => Vec::new(),
        };
        let predictions = match &self.predictor {
            Some(model) => {
                self.phase(
                    PipelinePhase::Prediction,
                    cancel,
                    model.predict_future_friction(&patterns, session),
                    &mut failures,
                    &mut degraded_phases,
                )
                .await
            }
            None => Vec::new(),
        };

        let base = base_context(session, &bundle);
        let synthesized = self.synthesizer.synthesize(
            SynthesisInputs {
                patterns: &patterns,
                workflow_issues: &workflow_issues,
                anomalies: &anomalies,
                predictions: &predictions,
            },
            &base,
        );
        let mut frictions = rank(synthesized);

        if let Some(evaluator) = &self.evaluator {
            failures.extend(evaluator.evaluate(&mut frictions, cancel).await);
        }

        let detection_quality = detection_quality(&frictions, &patterns);
        let elapsed = start.elapsed();
        let cancelled = cancel.is_cancelled();

        self.ledger.observe_patterns(&patterns).await;
        self.ledger
            .store_detection(
                session.session_id,
                &frictions,
                detection_quality,
                elapsed,
                cancelled,
            )
            .await;

        let report = DetectionReport {
            session_id: session.session_id,
            sensors_collected: bundle.readings().keys().cloned().collect(),
            sensors_missing: bundle.missing().to_vec(),
            patterns_found: patterns.len(),
            workflow_issues_found: workflow_issues.len(),
            anomalies_found: anomalies.len(),
            predictions_found: predictions.len(),
            degraded_phases,
            detection_quality,
            elapsed_ms: elapsed.as_millis() as u64,
            cancelled,
            failures,
            frictions,
        };

        info!(
            target: "friction.metrics",
            session_id = %report.session_id,
            frictions = report.frictions.len(),
            sensors_collected = report.sensors_collected.len(),
            sensors_missing = report.sensors_missing.len(),
            degraded_phases = report.degraded_phases.len(),
            detection_quality = report.detection_quality,
            elapsed_ms = report.elapsed_ms,
            cancelled = report.cancelled,
            "friction_detection_complete"
        );
        report
    }

    /// Run the resolution gate over already detected frictions.
    pub async fn auto_resolve(
        &self,
        frictions: &mut [DetectedFriction],
        cancel: &CancellationToken,
    ) -> GateReport {
        let start = Instant::now();
        let report = self.gate.resolve_all(frictions, cancel).await;
        info!(
            target: "friction.metrics",
            considered = report.decisions.len(),
            resolved = report.count(GateVerdict::Resolved),
            declined = report.count(GateVerdict::Declined),
            failed = report.count(GateVerdict::ExecutionFailed),
            rolled_back = report.count(GateVerdict::RolledBack),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "friction_resolution_complete"
        );
        report
    }

    /// Detect and, when `resolve` is set, auto-resolve in one call.
    pub async fn run_session(
        &self,
        session: &SessionAnalysis,
        resolve: bool,
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        let mut detection = self.detect(session, cancel).await;
        let gate = if resolve {
            Some(self.auto_resolve(&mut detection.frictions, cancel).await)
        } else {
            None
        };
        SessionOutcome { detection, gate }
    }

    async fn phase<T, F>(
        &self,
        phase: PipelinePhase,
        cancel: &CancellationToken,
        call: F,
        failures: &mut Vec<FrictionError>,
        degraded: &mut Vec<PipelinePhase>,
    ) -> Vec<T>
    where
        F: Future<Output = anyhow::Result<Vec<T>>>,
    {
        let start = Instant::now();
        match guarded(self.config.model_timeout(), cancel, call).await {
            Ok(values) => {
                info!(
                    phase = %phase,
                    found = values.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Phase complete"
                );
                values
            }
            Err(cause) => {
                let err = FrictionError::PipelinePhaseFailure { phase, cause };
                warn!(phase = %phase, error = %err, "Phase degraded to empty result");
                failures.push(err);
                degraded.push(phase);
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for FrictionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrictionEngine")
            .field("config", &self.config)
            .field("sensors", self.aggregator.registry())
            .finish_non_exhaustive()
    }
}

/// Mean confidence of the patterns behind pattern-derived frictions.
pub fn detection_quality(frictions: &[DetectedFriction], patterns: &[RecognizedPattern]) -> f64 {
    let confidences: Vec<f64> = frictions
        .iter()
        .filter_map(|f| f.pattern_id.as_deref())
        .filter_map(|id| patterns.iter().find(|p| p.id == id))
        .map(|p| p.confidence)
        .collect();
    if confidences.is_empty() {
        return NEUTRAL_DETECTION_QUALITY;
    }
    confidences.iter().sum::<f64>() / confidences.len() as f64
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::model::{FrictionResolution, FrictionSource, FrictionType, SolutionRecommendation};
    use crate::sensors::SensorReading;

    struct Quiet;

    #[async_trait]
    impl Sensor for Quiet {
        fn name(&self) -> &str {
            "quiet"
        }

        async fn collect(&self, _session: &SessionAnalysis) -> anyhow::Result<SensorReading> {
            Ok(SensorReading::Custom(serde_json::Value::Null))
        }
    }

    struct NeverCalled;

    #[async_trait]
    impl SolutionExecutor for NeverCalled {
        async fn implement_solution(
            &self,
            _friction: &DetectedFriction,
            _solution: &SolutionRecommendation,
        ) -> anyhow::Result<FrictionResolution> {
            anyhow::bail!("not expected")
        }
    }

    #[test]
    fn build_requires_sensors_and_executor() {
        let err = FrictionEngine::builder()
            .executor(Arc::new(NeverCalled))
            .build()
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("no sensors"));

        let err = FrictionEngine::builder()
            .sensor(Arc::new(Quiet))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("executor"));

        let mut config = EngineConfig::default();
        config.sensor_timeout_ms = 0;
        let err = FrictionEngine::builder()
            .sensor(Arc::new(Quiet))
            .executor(Arc::new(NeverCalled))
            .config(config)
            .build()
            .unwrap_err();
        assert!(err.is_fatal());

        assert!(FrictionEngine::builder()
            .sensor(Arc::new(Quiet))
            .executor(Arc::new(NeverCalled))
            .build()
            .is_ok());
    }

    #[test]
    fn detection_quality_averages_pattern_confidence() {
        let patterns = [
            RecognizedPattern::new("a", 0.5, 0.5, 0.6),
            RecognizedPattern::new("b", 0.5, 0.5, 0.9),
        ];
        let from = |id: &str| {
            DetectedFriction::new(FrictionType::RepetitiveTask, FrictionSource::Pattern, 0.5, 0.5, 0.5)
                .with_pattern(id)
        };
        let anomaly =
            DetectedFriction::new(FrictionType::PerformanceAnomaly, FrictionSource::Anomaly, 0.9, 0.0, 0.5);

        let quality = detection_quality(&[from("a"), from("b"), anomaly.clone()], &patterns);
        assert!((quality - 0.75).abs() < 1e-9);
        assert_eq!(detection_quality(&[], &patterns), 0.5);
        assert_eq!(detection_quality(&[anomaly], &patterns), 0.5);
    }

    #[tokio::test]
    async fn detect_without_models_is_empty_but_recorded() {
        let engine = FrictionEngine::builder()
            .sensor(Arc::new(Quiet))
            .executor(Arc::new(NeverCalled))
            .build()
            .unwrap();
        let session = SessionAnalysis::new("dana", "atlas");
        let report = engine.detect(&session, &CancellationToken::new()).await;

        assert!(report.frictions.is_empty());
        assert_eq!(report.sensors_collected, ["quiet"]);
        assert!(report.degraded_phases.is_empty());
        assert_eq!(report.detection_quality, 0.5);
        assert_eq!(engine.metrics().await.detection_times_ms.len(), 1);
    }
}
