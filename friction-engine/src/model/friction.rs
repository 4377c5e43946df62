//! The normalized friction record and its descriptive parts.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resolution::FrictionResolution;
use super::solution::{RoiEstimate, SolutionRecommendation};
use super::unit_interval;

/// Friction type tag. Known tags get variants; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FrictionType {
    RepetitiveTask,
    PerformanceBottleneck,
    WorkflowInefficiency,
    CodeQualityIssue,
    SecurityIssue,
    PerformanceAnomaly,
    Other(String),
}

impl FrictionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::RepetitiveTask => "repetitive_task",
            Self::PerformanceBottleneck => "performance_bottleneck",
            Self::WorkflowInefficiency => "workflow_inefficiency",
            Self::CodeQualityIssue => "code_quality_issue",
            Self::SecurityIssue => "security_issue",
            Self::PerformanceAnomaly => "performance_anomaly",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for FrictionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "repetitive_task" => Self::RepetitiveTask,
            "performance_bottleneck" => Self::PerformanceBottleneck,
            "workflow_inefficiency" => Self::WorkflowInefficiency,
            "code_quality_issue" => Self::CodeQualityIssue,
            "security_issue" => Self::SecurityIssue,
            "performance_anomaly" => Self::PerformanceAnomaly,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for FrictionType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<FrictionType> for String {
    fn from(value: FrictionType) -> Self {
        match value {
            FrictionType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FrictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Broad grouping used by ranking and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FrictionCategory {
    Performance,
    Automation,
    Quality,
    Workflow,
    General,
    Critical,
    Other(String),
}

impl FrictionCategory {
    /// Category implied by a friction type.
    pub fn for_type(friction_type: &FrictionType) -> Self {
        match friction_type {
            FrictionType::PerformanceBottleneck => Self::Performance,
            FrictionType::RepetitiveTask => Self::Automation,
            FrictionType::CodeQualityIssue => Self::Quality,
            FrictionType::WorkflowInefficiency => Self::Workflow,
            _ => Self::General,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Performance => "performance",
            Self::Automation => "automation",
            Self::Quality => "quality",
            Self::Workflow => "workflow",
            Self::General => "general",
            Self::Critical => "critical",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for FrictionCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "performance" => Self::Performance,
            "automation" => Self::Automation,
            "quality" => Self::Quality,
            "workflow" => Self::Workflow,
            "general" => Self::General,
            "critical" => Self::Critical,
            _ => Self::Other(value),
        }
    }
}

impl From<FrictionCategory> for String {
    fn from(value: FrictionCategory) -> Self {
        match value {
            FrictionCategory::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FrictionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which synthesis path produced a friction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionSource {
    Pattern,
    Workflow,
    Anomaly,
    Prediction,
}

/// Lifecycle state of a friction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionStatus {
    Detected,
    Predicted,
    Analyzing,
    Resolving,
    Resolved,
    Declined,
    Monitoring,
}

impl fmt::Display for FrictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Detected => "detected",
            Self::Predicted => "predicted",
            Self::Analyzing => "analyzing",
            Self::Resolving => "resolving",
            Self::Resolved => "resolved",
            Self::Declined => "declined",
            Self::Monitoring => "monitoring",
        };
        f.write_str(s)
    }
}

/// Snapshot of the session and sensor state a friction was detected in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrictionContext {
    pub developer: String,
    pub project: String,
    pub working_directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub day_of_week: String,
    #[serde(default)]
    pub hour: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_stage: Option<String>,
    #[serde(default)]
    pub tools_in_use: Vec<String>,
    #[serde(default)]
    pub affected_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_build_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flaky_tests: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_conflicts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outdated_dependencies: Option<u32>,
    /// Sensors whose readings were present in the bundle.
    #[serde(default)]
    pub sensors_reporting: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Direction and speed of change in how often a friction occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrictionTrend {
    pub direction: TrendDirection,
    /// Mean change in frequency per sample.
    pub velocity: f64,
    pub samples: usize,
}

/// Risk assessment attached to a friction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrictionRisk {
    pub business_impact: f64,
    pub technical_risk: f64,
    pub team_morale_impact: f64,
    pub customer_impact: f64,
}

/// Forward-looking expectation that a friction will (re)occur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturePrediction {
    pub confidence: f64,
    pub time_to_occurrence_secs: u64,
    #[serde(default)]
    pub prevention: Vec<String>,
}

impl FuturePrediction {
    pub fn time_to_occurrence(&self) -> Duration {
        Duration::from_secs(self.time_to_occurrence_secs)
    }
}

/// A normalized, contextualized friction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFriction {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub friction_type: FrictionType,
    pub category: FrictionCategory,
    pub severity: f64,
    pub frequency: f64,
    pub developer_impact: f64,
    pub source: FrictionSource,
    #[serde(default)]
    pub description: String,
    pub detected_at: DateTime<Utc>,
    pub context: FrictionContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
    #[serde(default)]
    pub time_wasted_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<FrictionTrend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<FrictionRisk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub future_prediction: Option<FuturePrediction>,
    pub status: FrictionStatus,
    #[serde(default)]
    pub recommended_solutions: Vec<SolutionRecommendation>,
    #[serde(default)]
    pub automation_potential: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi_estimate: Option<RoiEstimate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<FrictionResolution>,
    /// Set by the ranker; absent until ranking runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<f64>,
}

impl DetectedFriction {
    /// Scores are clamped into `[0, 1]`; developer impact is therefore capped at 1.
    pub fn new(
        friction_type: FrictionType,
        source: FrictionSource,
        severity: f64,
        frequency: f64,
        developer_impact: f64,
    ) -> Self {
        let category = FrictionCategory::for_type(&friction_type);
        Self {
            id: Uuid::new_v4(),
            friction_type,
            category,
            severity: unit_interval(severity),
            frequency: unit_interval(frequency),
            developer_impact: unit_interval(developer_impact),
            source,
            description: String::new(),
            detected_at: Utc::now(),
            context: FrictionContext::default(),
            pattern_id: None,
            time_wasted_secs: 0,
            trend: None,
            risk_assessment: None,
            future_prediction: None,
            status: FrictionStatus::Detected,
            recommended_solutions: Vec::new(),
            automation_potential: 0.0,
            roi_estimate: None,
            resolution: None,
            priority_score: None,
        }
    }

    pub fn with_category(mut self, category: FrictionCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_context(mut self, context: FrictionContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_pattern(mut self, pattern_id: impl Into<String>) -> Self {
        self.pattern_id = Some(pattern_id.into());
        self
    }

    pub fn with_time_wasted(mut self, wasted: Duration) -> Self {
        self.time_wasted_secs = wasted.as_secs();
        self
    }

    pub fn with_trend(mut self, trend: FrictionTrend) -> Self {
        self.trend = Some(trend);
        self
    }

    pub fn with_risk(mut self, risk: FrictionRisk) -> Self {
        self.risk_assessment = Some(risk);
        self
    }

    pub fn with_prediction(mut self, prediction: FuturePrediction) -> Self {
        self.future_prediction = Some(prediction);
        self
    }

    pub fn with_status(mut self, status: FrictionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_solutions(mut self, solutions: Vec<SolutionRecommendation>) -> Self {
        self.recommended_solutions = solutions;
        self
    }

    pub fn time_wasted(&self) -> Duration {
        Duration::from_secs(self.time_wasted_secs)
    }

    pub fn is_resolved(&self) -> bool {
        self.status == FrictionStatus::Resolved
    }
}
