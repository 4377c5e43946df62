//! Inputs handed to the engine: the session under analysis and the
//! candidates produced by the external pattern, anomaly, workflow and
//! prediction models.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::friction::{FrictionCategory, FrictionType};

/// A developer session, the unit every detection run is scoped to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalysis {
    #[serde(default = "Uuid::new_v4")]
    pub session_id: Uuid,
    pub developer: String,
    pub project: String,
    #[serde(default = "Utc::now")]
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub duration_secs: u64,
    #[serde(default)]
    pub working_directory: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_stage: Option<String>,
    #[serde(default)]
    pub tools_in_use: Vec<String>,
    #[serde(default)]
    pub recent_actions: Vec<String>,
}

impl SessionAnalysis {
    pub fn new(developer: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            developer: developer.into(),
            project: project.into(),
            started_at: Utc::now(),
            duration_secs: 0,
            working_directory: String::new(),
            git_branch: None,
            current_task: None,
            workflow_stage: None,
            tools_in_use: Vec::new(),
            recent_actions: Vec::new(),
        }
    }

    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = dir.into();
        self
    }

    pub fn with_git_branch(mut self, branch: impl Into<String>) -> Self {
        self.git_branch = Some(branch.into());
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

/// A recurring behaviour recognized by the external pattern model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedPattern {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "severity")]
    pub friction_severity: f64,
    pub frequency: f64,
    pub confidence: f64,
    #[serde(default)]
    pub typical_friction: Vec<FrictionType>,
    #[serde(default)]
    pub prevention_tips: Vec<String>,
    /// Oldest first. Two or more samples yield a trend.
    #[serde(default)]
    pub frequency_history: Vec<f64>,
    #[serde(default)]
    pub affected_files: Vec<String>,
}

impl RecognizedPattern {
    pub fn new(id: impl Into<String>, severity: f64, frequency: f64, confidence: f64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            friction_severity: severity,
            frequency,
            confidence,
            typical_friction: Vec::new(),
            prevention_tips: Vec::new(),
            frequency_history: Vec::new(),
            affected_files: Vec::new(),
        }
    }

    pub fn with_friction(mut self, friction_type: FrictionType) -> Self {
        self.typical_friction.push(friction_type);
        self
    }
}

/// A statistical outlier reported by the external anomaly detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedAnomaly {
    pub severity: f64,
    pub impact_score: f64,
    #[serde(rename = "type", default)]
    pub anomaly_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub affected_files: Vec<String>,
}

/// An inefficiency reported by the external workflow analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowIssue {
    #[serde(rename = "type", default)]
    pub issue_type: String,
    pub severity: f64,
    pub productivity_impact: f64,
    #[serde(default)]
    pub estimated_time_waste_secs: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub affected_files: Vec<String>,
}

/// A friction the external predictor expects to occur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionCandidate {
    #[serde(rename = "type")]
    pub friction_type: FrictionType,
    /// Derived from the type when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FrictionCategory>,
    pub severity: f64,
    pub estimated_impact: f64,
    pub confidence: f64,
    #[serde(default)]
    pub time_to_occurrence_secs: u64,
    #[serde(default)]
    pub prevention_strategies: Vec<String>,
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub description: String,
}
