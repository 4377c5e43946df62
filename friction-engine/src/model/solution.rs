//! Candidate remediations and the ROI estimate derived from the best one.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::unit_interval;

/// Risk level declared by the solution generator.
///
/// Parsing is case-insensitive; anything unrecognized becomes
/// [`RiskLevel::Unknown`], which scores like `medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl RiskLevel {
    /// Numeric risk used by solution selection.
    pub fn value(self) -> f64 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.5,
            Self::High => 0.8,
            Self::Critical => 1.0,
            Self::Unknown => 0.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

impl From<&str> for RiskLevel {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for RiskLevel {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<RiskLevel> for String {
    fn from(value: RiskLevel) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of remediation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SolutionType {
    Automation,
    Refactoring,
    Tooling,
    ProcessChange,
    Other(String),
}

impl SolutionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Automation => "automation",
            Self::Refactoring => "refactoring",
            Self::Tooling => "tooling",
            Self::ProcessChange => "process_change",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for SolutionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "automation" => Self::Automation,
            "refactoring" => Self::Refactoring,
            "tooling" => Self::Tooling,
            "process_change" => Self::ProcessChange,
            _ => Self::Other(value),
        }
    }
}

impl From<SolutionType> for String {
    fn from(value: SolutionType) -> Self {
        match value {
            SolutionType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SolutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate remediation produced by the external solution generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecommendation {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub solution_type: SolutionType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub reversibility: f64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub can_auto_implement: bool,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub estimated_time_to_implement_secs: u64,
    #[serde(default)]
    pub expected_time_savings_secs: u64,
    /// Command the executor runs to apply the remedy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_script: Option<String>,
    /// Command the executor runs to undo a failed application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_script: Option<String>,
    /// Files the remedy edits; overlapping sets never execute concurrently.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_files: Vec<String>,
}

impl SolutionRecommendation {
    pub fn new(solution_type: SolutionType, confidence: f64, risk_level: RiskLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            solution_type,
            title: String::new(),
            description: String::new(),
            confidence: unit_interval(confidence),
            risk_level,
            reversibility: 0.0,
            priority: 0,
            can_auto_implement: false,
            requires_approval: false,
            estimated_time_to_implement_secs: 0,
            expected_time_savings_secs: 0,
            automation_script: None,
            rollback_script: None,
            affected_files: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_reversibility(mut self, reversibility: f64) -> Self {
        self.reversibility = unit_interval(reversibility);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn auto_implementable(mut self, can_auto_implement: bool) -> Self {
        self.can_auto_implement = can_auto_implement;
        self
    }

    pub fn requiring_approval(mut self, requires_approval: bool) -> Self {
        self.requires_approval = requires_approval;
        self
    }

    pub fn with_timing(mut self, implement: Duration, savings: Duration) -> Self {
        self.estimated_time_to_implement_secs = implement.as_secs();
        self.expected_time_savings_secs = savings.as_secs();
        self
    }

    pub fn with_scripts(mut self, apply: impl Into<String>, rollback: Option<String>) -> Self {
        self.automation_script = Some(apply.into());
        self.rollback_script = rollback;
        self
    }

    pub fn with_affected_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn estimated_time_to_implement(&self) -> Duration {
        Duration::from_secs(self.estimated_time_to_implement_secs)
    }

    pub fn expected_time_savings(&self) -> Duration {
        Duration::from_secs(self.expected_time_savings_secs)
    }

    pub fn is_automation(&self) -> bool {
        self.solution_type == SolutionType::Automation
    }

    /// Safe to run without a human in the loop.
    pub fn is_unattended(&self) -> bool {
        self.can_auto_implement && !self.requires_approval
    }
}

/// Return-on-investment projection for a friction's best remedy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiEstimate {
    /// `None` when the remedy saves no time and never breaks even.
    pub weeks_to_breakeven: Option<f64>,
    pub time_savings_per_week_secs: u64,
    pub yearly_time_savings_secs: u64,
    pub implementation_cost_secs: u64,
    pub expected_time_savings_secs: u64,
    pub confidence: f64,
}

impl RoiEstimate {
    pub fn yearly_time_savings(&self) -> Duration {
        Duration::from_secs(self.yearly_time_savings_secs)
    }
}
