use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::solution::SolutionType;

/// Before/after measurement the executor may attach to a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactMeasurement {
    pub metric: String,
    pub baseline: f64,
    pub observed: f64,
}

impl ImpactMeasurement {
    /// Relative improvement, positive when `observed` is lower than `baseline`.
    pub fn improvement(&self) -> f64 {
        if self.baseline == 0.0 {
            return 0.0;
        }
        (self.baseline - self.observed) / self.baseline
    }
}

/// Outcome of applying one remedy to one friction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrictionResolution {
    pub id: Uuid,
    pub friction_id: Uuid,
    pub solution_id: Uuid,
    pub implementation_type: SolutionType,
    pub resolved_at: DateTime<Utc>,
    pub time_taken_ms: u64,
    pub success: bool,
    /// The executor undid a partial application.
    #[serde(default)]
    pub rolled_back: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_measurement: Option<ImpactMeasurement>,
    /// Why the attempt errored before the executor could report an outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FrictionResolution {
    pub fn succeeded(
        friction_id: Uuid,
        solution_id: Uuid,
        implementation_type: SolutionType,
        time_taken: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            friction_id,
            solution_id,
            implementation_type,
            resolved_at: Utc::now(),
            time_taken_ms: time_taken.as_millis() as u64,
            success: true,
            rolled_back: false,
            impact_measurement: None,
            error: None,
        }
    }

    pub fn failed(
        friction_id: Uuid,
        solution_id: Uuid,
        implementation_type: SolutionType,
        time_taken: Duration,
        rolled_back: bool,
    ) -> Self {
        Self {
            success: false,
            rolled_back,
            ..Self::succeeded(friction_id, solution_id, implementation_type, time_taken)
        }
    }

    pub fn with_impact(mut self, impact: ImpactMeasurement) -> Self {
        self.impact_measurement = Some(impact);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn time_taken(&self) -> Duration {
        Duration::from_millis(self.time_taken_ms)
    }
}
