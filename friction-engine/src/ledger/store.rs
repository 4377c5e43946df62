//! Ledger records and the append-only storage they are written to.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{FrictionError, FrictionResult};
use crate::model::{DetectedFriction, FrictionResolution, FrictionType};

/// One detection run and everything it found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub recorded_at: DateTime<Utc>,
    pub session_id: Uuid,
    pub elapsed_ms: u64,
    pub detection_quality: f64,
    #[serde(default)]
    pub cancelled: bool,
    pub frictions: Vec<DetectedFriction>,
}

/// One remedy attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub recorded_at: DateTime<Utc>,
    pub friction_id: Uuid,
    pub friction_type: FrictionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
    pub resolution: FrictionResolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternOutcome {
    /// The pattern was recognized in a session.
    Observed,
    /// A friction derived from the pattern was resolved.
    Resolved,
    /// A remedy for a friction derived from the pattern failed.
    ResolutionFailed,
}

/// Calibration signal for one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternFeedback {
    pub recorded_at: DateTime<Utc>,
    pub pattern_id: String,
    pub outcome: PatternOutcome,
    /// Confidence the recognizer reported for the observation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction_id: Option<Uuid>,
}

/// A single JSONL line in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum LedgerRecord {
    Detection(DetectionRecord),
    Resolution(ResolutionRecord),
    PatternFeedback(PatternFeedback),
}

/// Append-only persistence for ledger records.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    async fn append(&self, record: &LedgerRecord) -> FrictionResult<()>;
}

/// Keeps records in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStorage {
    records: Mutex<Vec<LedgerRecord>>,
}

impl InMemoryLedgerStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<LedgerRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl LedgerStorage for InMemoryLedgerStorage {
    async fn append(&self, record: &LedgerRecord) -> FrictionResult<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonlLedgerStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlLedgerStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record in a ledger file. Blank lines are skipped; a
    /// malformed line is an error naming its line number.
    pub async fn read_all(path: &Path) -> FrictionResult<Vec<LedgerRecord>> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            FrictionError::ledger(format!("failed to read {}: {e}", path.display()))
        })?;
        let mut records = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|e| {
                FrictionError::ledger(format!(
                    "{}:{}: invalid ledger record: {e}",
                    path.display(),
                    index + 1
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

#[async_trait]
impl LedgerStorage for JsonlLedgerStorage {
    async fn append(&self, record: &LedgerRecord) -> FrictionResult<()> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| FrictionError::ledger(format!("failed to serialize record: {e}")))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                FrictionError::ledger(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                FrictionError::ledger(format!("failed to open {}: {e}", self.path.display()))
            })?;
        file.write_all(line.as_bytes()).await.map_err(|e| {
            FrictionError::ledger(format!("failed to append to {}: {e}", self.path.display()))
        })?;
        file.flush()
            .await
            .map_err(|e| FrictionError::ledger(format!("failed to flush ledger: {e}")))?;
        Ok(())
    }
}
