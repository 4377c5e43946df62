//! Friction Engine Library
//!
//! Prioritizes developer-productivity friction and decides which of it may be
//! fixed without a human in the loop:
//! - Sensor aggregation into one timestamped bundle per session
//! - Friction synthesis from patterns, workflow issues, anomalies and predictions
//! - Deterministic priority ranking
//! - Solution evaluation (automation potential, ROI)
//! - A risk-gated auto-resolution pass with bounded, file-aware concurrency
//! - An append-only outcome ledger for calibration
//!
//! # Usage
//!
//! ```ignore
//! let engine = FrictionEngine::builder()
//!     .sensor(Arc::new(build_sensor))
//!     .pattern_recognizer(Arc::new(recognizer))
//!     .solution_generator(Arc::new(generator))
//!     .executor(Arc::new(executor))
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! let outcome = engine.run_session(&session, true, &cancel).await;
//! ```

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod gate;
pub mod guard;
pub mod ledger;
pub mod model;
pub mod ranking;
pub mod sensors;
pub mod synthesis;

// Re-export the engine surface
pub use engine::{DetectionReport, FrictionEngine, FrictionEngineBuilder, SessionOutcome};

// Re-export configuration and errors
pub use config::{EngineConfig, GatePolicy, SynthesisThresholds};
pub use error::{CallFailure, FrictionError, FrictionResult, PipelinePhase};

// Re-export collaborator traits
pub use collaborators::{
    AnomalyDetector, FrictionPredictor, PatternRecognizer, SolutionExecutor, SolutionGenerator,
    WorkflowAnalyzer,
};
pub use sensors::{Sensor, SensorBundle, SensorReading, SensorRegistry};

// Re-export gate and ledger types
pub use gate::{DeclineReason, GateDecision, GateReport, GateVerdict};
pub use ledger::{
    FrictionMetrics, InMemoryLedgerStorage, JsonlLedgerStorage, LedgerRecord, LedgerStorage,
    LedgerSummary, OutcomeLedger, PatternCalibration,
};

// Re-export the data model
pub use model::{
    DetectedAnomaly, DetectedFriction, FrictionCategory, FrictionContext, FrictionResolution,
    FrictionRisk, FrictionSource, FrictionStatus, FrictionTrend, FrictionType, FuturePrediction,
    ImpactMeasurement, PredictionCandidate, RecognizedPattern, RiskLevel, RoiEstimate,
    SessionAnalysis, SolutionRecommendation, SolutionType, TrendDirection, WorkflowIssue,
};
pub use ranking::{priority_score, rank};
