//! Friction engine error taxonomy.
//!
//! Every failure class in the detection and resolution paths is represented
//! here. Only [`FrictionError::Configuration`] is fatal; everything else is
//! scoped to one sensor, phase, friction or ledger write and degrades the run
//! instead of aborting it.
//!
//! | Variant                     | Scope          | Fatal |
//! |-----------------------------|----------------|-------|
//! | SensorFailure               | one sensor     | no    |
//! | PipelinePhaseFailure        | one phase      | no    |
//! | SolutionGenerationFailure   | one friction   | no    |
//! | ResolutionExecutionFailure  | one friction   | no    |
//! | LedgerStorage               | one record     | no    |
//! | Configuration               | engine build   | yes   |

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result alias for engine operations.
pub type FrictionResult<T> = Result<T, FrictionError>;

/// Why a single external call did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CallFailure {
    /// The collaborator returned an error.
    Failed { message: String },
    /// The call exceeded its timeout.
    TimedOut { timeout_ms: u64 },
    /// The run was cancelled while the call was in flight.
    Cancelled,
}

impl CallFailure {
    pub fn failed(err: &anyhow::Error) -> Self {
        Self::Failed {
            message: format!("{err:#}"),
        }
    }

    pub fn timed_out(timeout: Duration) -> Self {
        Self::TimedOut {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { message } => write!(f, "{message}"),
            Self::TimedOut { timeout_ms } => write!(f, "timed out after {timeout_ms}ms"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Analysis phases that consult an external model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    PatternRecognition,
    WorkflowAnalysis,
    AnomalyDetection,
    Prediction,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PatternRecognition => write!(f, "pattern_recognition"),
            Self::WorkflowAnalysis => write!(f, "workflow_analysis"),
            Self::AnomalyDetection => write!(f, "anomaly_detection"),
            Self::Prediction => write!(f, "prediction"),
        }
    }
}

/// Errors produced by the friction engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrictionError {
    /// A sensor failed; its reading is omitted from the bundle.
    #[error("sensor '{sensor}' failed: {cause}")]
    SensorFailure { sensor: String, cause: CallFailure },

    /// An analysis phase failed; the pipeline continues with an empty result.
    #[error("{phase} phase failed: {cause}")]
    PipelinePhaseFailure {
        phase: PipelinePhase,
        cause: CallFailure,
    },

    /// Solution generation failed for one friction.
    #[error("solution generation failed for friction {friction_id}: {cause}")]
    SolutionGenerationFailure {
        friction_id: Uuid,
        cause: CallFailure,
    },

    /// Executing the selected remedy failed for one friction.
    #[error("resolution of friction {friction_id} failed: {cause}")]
    ResolutionExecutionFailure {
        friction_id: Uuid,
        cause: CallFailure,
    },

    /// Writing to the outcome ledger failed.
    #[error("ledger storage error: {message}")]
    LedgerStorage { message: String },

    /// The engine cannot start with the given wiring or configuration.
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl FrictionError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn ledger(message: impl Into<String>) -> Self {
        Self::LedgerStorage {
            message: message.into(),
        }
    }

    /// Whether this error must be surfaced before any detection run starts.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// The underlying call failure, if this error wraps one.
    pub fn cause(&self) -> Option<&CallFailure> {
        match self {
            Self::SensorFailure { cause, .. }
            | Self::PipelinePhaseFailure { cause, .. }
            | Self::SolutionGenerationFailure { cause, .. }
            | Self::ResolutionExecutionFailure { cause, .. } => Some(cause),
            Self::LedgerStorage { .. } | Self::Configuration { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_is_fatal() {
        assert!(FrictionError::configuration("no sensors").is_fatal());
        assert!(!FrictionError::ledger("disk full").is_fatal());
        let err = FrictionError::SensorFailure {
            sensor: "build_performance".into(),
            cause: CallFailure::Cancelled,
        };
        assert!(!err.is_fatal());
        assert_eq!(err.cause(), Some(&CallFailure::Cancelled));
    }

    #[test]
    fn display_includes_phase_and_cause() {
        let err = FrictionError::PipelinePhaseFailure {
            phase: PipelinePhase::Prediction,
            cause: CallFailure::timed_out(Duration::from_millis(1500)),
        };
        assert_eq!(
            err.to_string(),
            "prediction phase failed: timed out after 1500ms"
        );
    }

    #[test]
    fn failed_keeps_context_chain() {
        let err = anyhow::anyhow!("connection refused").context("model endpoint unreachable");
        let cause = CallFailure::failed(&err);
        assert_eq!(
            cause.to_string(),
            "model endpoint unreachable: connection refused"
        );
    }
}
