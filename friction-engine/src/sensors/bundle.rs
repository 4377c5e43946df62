//! Sensor readings and the immutable bundle they are collected into.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One typed reading from one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum SensorReading {
    CodeQuality {
        #[serde(default)]
        complexity_violations: u32,
        #[serde(default)]
        code_duplication: f64,
        #[serde(default)]
        style_violations: u32,
        #[serde(default)]
        security_issues: u32,
        #[serde(default)]
        hotspot_files: Vec<String>,
    },
    BuildPerformance {
        average_build_secs: f64,
        #[serde(default)]
        build_failures: u32,
        #[serde(default)]
        cache_hit_rate: f64,
        #[serde(default)]
        dependency_resolution_secs: f64,
    },
    TestEfficiency {
        execution_secs: f64,
        #[serde(default)]
        flaky_tests: u32,
        #[serde(default)]
        coverage: f64,
        #[serde(default)]
        slow_tests: Vec<String>,
    },
    Dependencies {
        #[serde(default)]
        outdated: u32,
        #[serde(default)]
        vulnerabilities: u32,
        #[serde(default)]
        license_conflicts: u32,
        #[serde(default)]
        footprint_mb: f64,
    },
    GitWorkflow {
        #[serde(default)]
        merge_conflicts: u32,
        #[serde(default)]
        branch_divergence: u32,
        #[serde(default)]
        commits_per_day: f64,
        #[serde(default)]
        pr_review_hours: f64,
    },
    Custom(serde_json::Value),
}

/// Timestamped collection of sensor readings for one session.
///
/// Produced once by the aggregator and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorBundle {
    collected_at: DateTime<Utc>,
    session_id: Uuid,
    readings: BTreeMap<String, SensorReading>,
    missing: Vec<String>,
}

impl SensorBundle {
    pub fn new(
        collected_at: DateTime<Utc>,
        session_id: Uuid,
        readings: BTreeMap<String, SensorReading>,
        mut missing: Vec<String>,
    ) -> Self {
        missing.sort();
        Self {
            collected_at,
            session_id,
            readings,
            missing,
        }
    }

    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn readings(&self) -> &BTreeMap<String, SensorReading> {
        &self.readings
    }

    pub fn get(&self, sensor: &str) -> Option<&SensorReading> {
        self.readings.get(sensor)
    }

    /// Sensors that failed, timed out or were cancelled.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// First reading matching `pick`, in sensor-name order.
    pub fn find<T>(&self, pick: impl Fn(&SensorReading) -> Option<T>) -> Option<T> {
        self.readings.values().find_map(pick)
    }
}
