//! Sensor capability trait, registry and the concurrent aggregator.

pub mod aggregator;
pub mod bundle;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::model::SessionAnalysis;

pub use aggregator::SensorAggregator;
pub use bundle::{SensorBundle, SensorReading};

/// A read-only signal source producing one reading per session.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Registry key; also the key of the reading in the bundle.
    fn name(&self) -> &str;

    async fn collect(&self, session: &SessionAnalysis) -> anyhow::Result<SensorReading>;
}

/// Name-keyed set of sensors. Registering a name twice replaces the first.
#[derive(Clone, Default)]
pub struct SensorRegistry {
    sensors: BTreeMap<String, Arc<dyn Sensor>>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sensor: Arc<dyn Sensor>) -> Option<Arc<dyn Sensor>> {
        self.sensors.insert(sensor.name().to_string(), sensor)
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sensors.keys().map(String::as_str)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn Sensor>)> {
        self.sensors.iter()
    }
}

impl std::fmt::Debug for SensorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorRegistry")
            .field("sensors", &self.sensors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl Sensor for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn collect(&self, _session: &SessionAnalysis) -> anyhow::Result<SensorReading> {
            Ok(SensorReading::Custom(serde_json::json!({ "sensor": self.0 })))
        }
    }

    #[test]
    fn registry_is_keyed_by_name() {
        let mut registry = SensorRegistry::new();
        assert!(registry.register(Arc::new(Named("git_workflow"))).is_none());
        assert!(registry.register(Arc::new(Named("code_quality"))).is_none());
        assert!(registry.register(Arc::new(Named("git_workflow"))).is_some());
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            ["code_quality", "git_workflow"]
        );
    }
}
