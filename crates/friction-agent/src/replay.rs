//! Session replay: feed a recorded session fixture through the engine.
//!
//! A fixture is a JSON document holding the session, what each sensor
//! reported, what each model returned and the remedies on offer per friction
//! type. Any sensor or model can be scripted to fail, which lets a run
//! reproduce degraded production sessions offline.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use friction_engine::{
    AnomalyDetector, DetectedAnomaly, DetectedFriction, FrictionPredictor, PatternRecognizer,
    PredictionCandidate, RecognizedPattern, Sensor, SensorBundle, SensorReading, SessionAnalysis,
    SolutionGenerator, SolutionRecommendation, WorkflowAnalyzer, WorkflowIssue,
};
use serde::{Deserialize, Serialize};

/// Solutions under this key are offered to frictions without their own entry.
pub const FALLBACK_SOLUTIONS_KEY: &str = "*";

/// What one sensor does when collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorScript {
    Reading(SensorReading),
    Failure { error: String },
}

/// Scripted model failures. A set field makes that call fail with its message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedFailures {
    pub pattern_recognition: Option<String>,
    pub workflow_analysis: Option<String>,
    pub anomaly_detection: Option<String>,
    pub prediction: Option<String>,
    pub solution_generation: Option<String>,
}

/// A recorded session and everything its collaborators answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFixture {
    pub session: SessionAnalysis,
    pub sensors: BTreeMap<String, SensorScript>,
    #[serde(default)]
    pub patterns: Vec<RecognizedPattern>,
    #[serde(default)]
    pub workflow_issues: Vec<WorkflowIssue>,
    #[serde(default)]
    pub anomalies: Vec<DetectedAnomaly>,
    #[serde(default)]
    pub predictions: Vec<PredictionCandidate>,
    /// Keyed by friction type, with [`FALLBACK_SOLUTIONS_KEY`] as the catch-all.
    #[serde(default)]
    pub solutions: BTreeMap<String, Vec<SolutionRecommendation>>,
    #[serde(default)]
    pub failures: ScriptedFailures,
}

impl SessionFixture {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session fixture from {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("Failed to parse session fixture in {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let fixture: Self = serde_json::from_str(text)?;
        if fixture.sensors.is_empty() {
            anyhow::bail!("fixture declares no sensors");
        }
        Ok(fixture)
    }

    /// One replay sensor per declared sensor entry.
    pub fn sensors(&self) -> Vec<Arc<dyn Sensor>> {
        self.sensors
            .iter()
            .map(|(name, script)| {
                Arc::new(ReplaySensor {
                    name: name.clone(),
                    script: script.clone(),
                }) as Arc<dyn Sensor>
            })
            .collect()
    }

    fn solutions_for(&self, friction: &DetectedFriction) -> Vec<SolutionRecommendation> {
        self.solutions
            .get(friction.friction_type.as_str())
            .or_else(|| self.solutions.get(FALLBACK_SOLUTIONS_KEY))
            .cloned()
            .unwrap_or_default()
    }
}

/// Sensor that answers with its recorded reading or failure.
#[derive(Debug, Clone)]
pub struct ReplaySensor {
    name: String,
    script: SensorScript,
}

#[async_trait]
impl Sensor for ReplaySensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self, _session: &SessionAnalysis) -> Result<SensorReading> {
        match &self.script {
            SensorScript::Reading(reading) => Ok(reading.clone()),
            SensorScript::Failure { error } => anyhow::bail!("{error}"),
        }
    }
}

/// Every model and the solution generator, answering from one fixture.
#[derive(Debug, Clone)]
pub struct ReplayModels {
    fixture: Arc<SessionFixture>,
}

impl ReplayModels {
    pub fn new(fixture: Arc<SessionFixture>) -> Self {
        Self { fixture }
    }

    fn scripted<T: Clone>(failure: &Option<String>, values: &[T]) -> Result<Vec<T>> {
        match failure {
            Some(message) => anyhow::bail!("{message}"),
            None => Ok(values.to_vec()),
        }
    }
}

#[async_trait]
impl PatternRecognizer for ReplayModels {
    async fn analyze_patterns(&self, _bundle: &SensorBundle) -> Result<Vec<RecognizedPattern>> {
        Self::scripted(
            &self.fixture.failures.pattern_recognition,
            &self.fixture.patterns,
        )
    }
}

#[async_trait]
impl WorkflowAnalyzer for ReplayModels {
    async fn analyze_workflow(
        &self,
        _bundle: &SensorBundle,
        _patterns: &[RecognizedPattern],
    ) -> Result<Vec<WorkflowIssue>> {
        Self::scripted(
            &self.fixture.failures.workflow_analysis,
            &self.fixture.workflow_issues,
        )
    }
}

#[async_trait]
impl AnomalyDetector for ReplayModels {
    async fn detect_anomalies(&self, _bundle: &SensorBundle) -> Result<Vec<DetectedAnomaly>> {
        Self::scripted(
            &self.fixture.failures.anomaly_detection,
            &self.fixture.anomalies,
        )
    }
}

#[async_trait]
impl FrictionPredictor for ReplayModels {
    async fn predict_future_friction(
        &self,
        _patterns: &[RecognizedPattern],
        _session: &SessionAnalysis,
    ) -> Result<Vec<PredictionCandidate>> {
        Self::scripted(&self.fixture.failures.prediction, &self.fixture.predictions)
    }
}

#[async_trait]
impl SolutionGenerator for ReplayModels {
    async fn generate_solutions(
        &self,
        friction: &DetectedFriction,
    ) -> Result<Vec<SolutionRecommendation>> {
        if let Some(message) = &self.fixture.failures.solution_generation {
            anyhow::bail!("{message}");
        }
        Ok(self.fixture.solutions_for(friction))
    }
}

#[cfg(test)]
mod tests {
    use friction_engine::{FrictionSource, FrictionType};

    use super::*;

    const FIXTURE: &str = r#"{
        "session": { "developer": "dana", "project": "atlas" },
        "sensors": {
            "build_performance": { "kind": "build_performance", "data": { "average_build_secs": 180.0 } },
            "git_workflow": { "error": "git not on PATH" }
        },
        "solutions": {
            "performance_bottleneck": [
                { "type": "automation", "confidence": 0.9, "risk_level": "low", "reversibility": 0.8 }
            ],
            "*": [
                { "type": "process_change", "confidence": 0.4, "risk_level": "medium", "reversibility": 0.5 }
            ]
        },
        "failures": { "anomaly_detection": "model offline" }
    }"#;

    fn friction(friction_type: FrictionType) -> DetectedFriction {
        DetectedFriction::new(friction_type, FrictionSource::Pattern, 0.5, 0.5, 0.5)
    }

    #[test]
    fn sensor_entries_parse_as_readings_or_failures() {
        let fixture = SessionFixture::from_json(FIXTURE).unwrap();
        assert!(matches!(
            fixture.sensors["build_performance"],
            SensorScript::Reading(SensorReading::BuildPerformance { .. })
        ));
        assert_eq!(
            fixture.sensors["git_workflow"],
            SensorScript::Failure {
                error: "git not on PATH".into()
            }
        );
        assert_eq!(fixture.sensors().len(), 2);
    }

    #[test]
    fn fixture_without_sensors_is_rejected() {
        let err = SessionFixture::from_json(
            r#"{ "session": { "developer": "d", "project": "p" }, "sensors": {} }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no sensors"));
    }

    #[tokio::test]
    async fn scripted_failures_surface_as_errors() {
        let fixture = Arc::new(SessionFixture::from_json(FIXTURE).unwrap());
        let models = ReplayModels::new(fixture.clone());
        let bundle = SensorBundle::new(
            chrono::Utc::now(),
            fixture.session.session_id,
            Default::default(),
            vec![],
        );

        let err = models.detect_anomalies(&bundle).await.unwrap_err();
        assert_eq!(err.to_string(), "model offline");
        assert!(models.analyze_patterns(&bundle).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn solutions_fall_back_to_catch_all() {
        let models = ReplayModels::new(Arc::new(SessionFixture::from_json(FIXTURE).unwrap()));

        let own = models
            .generate_solutions(&friction(FrictionType::PerformanceBottleneck))
            .await
            .unwrap();
        assert_eq!(own[0].confidence, 0.9);

        let fallback = models
            .generate_solutions(&friction(FrictionType::RepetitiveTask))
            .await
            .unwrap();
        assert_eq!(fallback[0].confidence, 0.4);
    }
}
