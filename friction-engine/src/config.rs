//! Engine configuration: per-call timeouts, gate policy and synthesis thresholds.
//!
//! Defaults reproduce the fixed constants of the detection and gating rules,
//! so an empty TOML document yields the reference behaviour.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FrictionError, FrictionResult};
use crate::model::RiskLevel;

/// Thresholds that decide which external candidates become frictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisThresholds {
    /// Anomalies must be strictly above this severity to be significant.
    pub significant_anomaly_severity: f64,
    /// Predictions must be strictly above this confidence to be admitted.
    pub min_prediction_confidence: f64,
}

impl Default for SynthesisThresholds {
    fn default() -> Self {
        Self {
            significant_anomaly_severity: 0.6,
            min_prediction_confidence: 0.7,
        }
    }
}

/// Auto-resolution safety policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatePolicy {
    /// Frictions whose assessed technical risk exceeds this are never auto-resolved.
    pub max_technical_risk: f64,
    /// A qualifying solution must have confidence strictly above this.
    pub min_solution_confidence: f64,
    /// A qualifying solution must carry exactly this risk level.
    pub required_risk_level: RiskLevel,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            max_technical_risk: 0.5,
            min_solution_confidence: 0.8,
            required_risk_level: RiskLevel::Low,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout for each sensor `collect` call.
    pub sensor_timeout_ms: u64,
    /// Timeout for pattern, workflow, anomaly and prediction model calls.
    pub model_timeout_ms: u64,
    /// Timeout for one `generate_solutions` call.
    pub solution_timeout_ms: u64,
    /// Timeout for one remedy execution.
    pub execution_timeout_ms: u64,
    /// Upper bound on remedies executing at the same time.
    pub max_concurrent_resolutions: usize,
    /// Assumed recurrences per week used by the ROI estimate.
    pub recurrences_per_week: u32,
    pub synthesis: SynthesisThresholds,
    pub policy: GatePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sensor_timeout_ms: 5_000,
            model_timeout_ms: 30_000,
            solution_timeout_ms: 30_000,
            execution_timeout_ms: 300_000,
            max_concurrent_resolutions: 4,
            recurrences_per_week: 5,
            synthesis: SynthesisThresholds::default(),
            policy: GatePolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Parse from a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> FrictionResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| {
            FrictionError::configuration(format!("invalid engine config TOML: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn sensor_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_timeout_ms)
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }

    pub fn solution_timeout(&self) -> Duration {
        Duration::from_millis(self.solution_timeout_ms)
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> FrictionResult<()> {
        let timeouts = [
            ("sensor_timeout_ms", self.sensor_timeout_ms),
            ("model_timeout_ms", self.model_timeout_ms),
            ("solution_timeout_ms", self.solution_timeout_ms),
            ("execution_timeout_ms", self.execution_timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(FrictionError::configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        if self.max_concurrent_resolutions == 0 {
            return Err(FrictionError::configuration(
                "max_concurrent_resolutions must be at least 1",
            ));
        }
        if self.recurrences_per_week == 0 {
            return Err(FrictionError::configuration(
                "recurrences_per_week must be at least 1",
            ));
        }
        let unit = [
            (
                "synthesis.significant_anomaly_severity",
                self.synthesis.significant_anomaly_severity,
            ),
            (
                "synthesis.min_prediction_confidence",
                self.synthesis.min_prediction_confidence,
            ),
            ("policy.max_technical_risk", self.policy.max_technical_risk),
            (
                "policy.min_solution_confidence",
                self.policy.min_solution_confidence,
            ),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(FrictionError::configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_thresholds() {
        let config = EngineConfig::default();
        assert_eq!(config.synthesis.significant_anomaly_severity, 0.6);
        assert_eq!(config.synthesis.min_prediction_confidence, 0.7);
        assert_eq!(config.policy.max_technical_risk, 0.5);
        assert_eq!(config.policy.min_solution_confidence, 0.8);
        assert_eq!(config.policy.required_risk_level, RiskLevel::Low);
        assert_eq!(config.recurrences_per_week, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            max_concurrent_resolutions = 2

            [policy]
            min_solution_confidence = 0.9
            "#,
        )
        .unwrap();
        assert_eq!(config.max_concurrent_resolutions, 2);
        assert_eq!(config.policy.min_solution_confidence, 0.9);
        assert_eq!(config.policy.max_technical_risk, 0.5);
        assert_eq!(config.sensor_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = EngineConfig::from_toml_str("max_concurrent_resolutions = 0").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut config = EngineConfig::default();
        config.policy.max_technical_risk = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_configuration_error() {
        let err = EngineConfig::from_toml_str("sensor_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, FrictionError::Configuration { .. }));
    }
}
