//! Concurrent fan-out/fan-in over every registered sensor.
//!
//! ```text
//! collected_at = now()
//! JoinSet::spawn(guarded(sensor.collect(session))) × N
//!   join_next() until drained
//!     Ok(reading)  → readings[name]
//!     Err(cause)   → warn!, missing += name
//!     panic        → warn!, missing += name
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{SensorBundle, SensorReading, SensorRegistry};
use crate::error::{CallFailure, FrictionError};
use crate::guard::guarded;
use crate::model::SessionAnalysis;

struct SensorOutcome {
    name: String,
    result: Result<SensorReading, CallFailure>,
    elapsed: Duration,
}

/// Collects one reading per registered sensor into a [`SensorBundle`].
#[derive(Debug, Clone)]
pub struct SensorAggregator {
    registry: SensorRegistry,
    timeout: Duration,
}

impl SensorAggregator {
    pub fn new(registry: SensorRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    /// Never fails: a sensor that errors, times out, panics or is cancelled
    /// is listed in [`SensorBundle::missing`] instead.
    pub async fn collect(
        &self,
        session: Arc<SessionAnalysis>,
        cancel: &CancellationToken,
    ) -> SensorBundle {
        let collected_at = Utc::now();
        let mut pending: BTreeSet<String> = BTreeSet::new();
        let mut join_set: JoinSet<SensorOutcome> = JoinSet::new();

        for (name, sensor) in self.registry.iter() {
            pending.insert(name.clone());
            let name = name.clone();
            let sensor = Arc::clone(sensor);
            let session = Arc::clone(&session);
            let cancel = cancel.clone();
            let timeout = self.timeout;

            join_set.spawn(async move {
                let start = Instant::now();
                let result = guarded(timeout, &cancel, sensor.collect(&session)).await;
                SensorOutcome {
                    name,
                    result,
                    elapsed: start.elapsed(),
                }
            });
        }

        let mut readings = BTreeMap::new();
        let mut missing = Vec::new();
        while let Some(res) = join_set.join_next().await {
            match res {
                Ok(outcome) => {
                    pending.remove(&outcome.name);
                    match outcome.result {
                        Ok(reading) => {
                            debug!(
                                sensor = %outcome.name,
                                elapsed_ms = outcome.elapsed.as_millis() as u64,
                                "Sensor reading collected"
                            );
                            readings.insert(outcome.name, reading);
                        }
                        Err(cause) => {
                            let err = FrictionError::SensorFailure {
                                sensor: outcome.name.clone(),
                                cause,
                            };
                            warn!(sensor = %outcome.name, error = %err, "Sensor omitted from bundle");
                            missing.push(outcome.name);
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Sensor task panicked");
                }
            }
        }
        // Whatever is still pending belongs to a task that panicked.
        missing.extend(pending);

        SensorBundle::new(collected_at, session.session_id, readings, missing)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::sensors::Sensor;

    enum Behaviour {
        Ok,
        Fail,
        Hang,
        Panic,
    }

    struct ScriptedSensor {
        name: &'static str,
        behaviour: Behaviour,
    }

    #[async_trait]
    impl Sensor for ScriptedSensor {
        fn name(&self) -> &str {
            self.name
        }

        async fn collect(&self, _session: &SessionAnalysis) -> anyhow::Result<SensorReading> {
            match self.behaviour {
                Behaviour::Ok => Ok(SensorReading::GitWorkflow {
                    merge_conflicts: 2,
                    branch_divergence: 0,
                    commits_per_day: 4.0,
                    pr_review_hours: 6.0,
                }),
                Behaviour::Fail => anyhow::bail!("git not installed"),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    anyhow::bail!("unreachable")
                }
                Behaviour::Panic => panic!("sensor bug"),
            }
        }
    }

    fn aggregator(sensors: Vec<ScriptedSensor>) -> SensorAggregator {
        let mut registry = SensorRegistry::new();
        for sensor in sensors {
            registry.register(Arc::new(sensor));
        }
        SensorAggregator::new(registry, Duration::from_millis(100))
    }

    fn session() -> Arc<SessionAnalysis> {
        Arc::new(SessionAnalysis::new("dana", "atlas"))
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_isolated() {
        let agg = aggregator(vec![
            ScriptedSensor {
                name: "git_workflow",
                behaviour: Behaviour::Ok,
            },
            ScriptedSensor {
                name: "code_quality",
                behaviour: Behaviour::Fail,
            },
            ScriptedSensor {
                name: "build_performance",
                behaviour: Behaviour::Hang,
            },
            ScriptedSensor {
                name: "test_efficiency",
                behaviour: Behaviour::Panic,
            },
        ]);
        let session = session();
        let bundle = agg.collect(session.clone(), &CancellationToken::new()).await;

        assert_eq!(bundle.len(), 1);
        assert!(bundle.get("git_workflow").is_some());
        assert_eq!(
            bundle.missing(),
            ["build_performance", "code_quality", "test_efficiency"]
        );
        assert_eq!(bundle.session_id(), session.session_id);
    }

    #[tokio::test]
    async fn timestamp_precedes_collection() {
        let before = Utc::now();
        let agg = aggregator(vec![ScriptedSensor {
            name: "git_workflow",
            behaviour: Behaviour::Ok,
        }]);
        let bundle = agg.collect(session(), &CancellationToken::new()).await;
        assert!(bundle.collected_at() >= before);
        assert!(bundle.collected_at() <= Utc::now());
    }

    #[tokio::test]
    async fn cancelled_collection_yields_empty_bundle() {
        let agg = aggregator(vec![ScriptedSensor {
            name: "build_performance",
            behaviour: Behaviour::Hang,
        }]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let bundle = agg.collect(session(), &cancel).await;
        assert!(bundle.is_empty());
        assert_eq!(bundle.missing(), ["build_performance"]);
    }
}
