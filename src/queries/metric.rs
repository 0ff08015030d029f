use super::QueryDefinition;
use crate::error::ExporterError;
use prometheus::{GaugeVec, Opts, Registry};
use std::collections::HashMap;
use tracing::{debug, warn};

/// The gauge backing one query definition.
#[derive(Clone)]
pub struct QueryMetric {
    gauge: GaugeVec,
    label_count: usize,
}

impl QueryMetric {
    /// # Errors
    ///
    /// Returns a configuration error if the metric or label names are invalid.
    pub fn new(definition: &QueryDefinition) -> Result<Self, ExporterError> {
        let labels: Vec<&str> = definition.label_names.iter().map(String::as_str).collect();

        let gauge = GaugeVec::new(
            Opts::new(
                definition.metric_name(),
                format!("Result of an RQL query {}", definition.name),
            ),
            &labels,
        )
        .map_err(|e| {
            ExporterError::config(format!("invalid metric for query [{}]: {e}", definition.name))
        })?;

        Ok(Self {
            gauge,
            label_count: labels.len(),
        })
    }

    /// Set the series identified by `labels` (in label-field order).
    pub fn set(&self, labels: &[String], value: f64) {
        let values: Vec<&str> = labels.iter().map(String::as_str).collect();
        match self.gauge.get_metric_with_label_values(&values) {
            Ok(gauge) => gauge.set(value),
            Err(e) => warn!(error = %e, "label values do not match the query labels"),
        }
    }

    /// Set the unlabeled form of the metric. Labeled queries get every label
    /// set to the empty string, which Prometheus treats as an absent label.
    pub fn set_fallback(&self, value: f64) {
        let empty = vec![""; self.label_count];
        self.gauge.with_label_values(&empty).set(value);
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.gauge.clone()))
    }
}

/// Query name to gauge, built once before any polling starts.
#[derive(Clone, Default)]
pub struct QueryMetrics {
    metrics: HashMap<String, QueryMetric>,
}

impl QueryMetrics {
    /// Create and register one gauge per definition.
    ///
    /// # Errors
    ///
    /// Returns a configuration error on an invalid metric, a duplicate name or
    /// a registration clash with an existing collector.
    pub fn register(
        definitions: &[QueryDefinition],
        registry: &Registry,
    ) -> Result<Self, ExporterError> {
        let mut metrics = HashMap::with_capacity(definitions.len());

        for definition in definitions {
            if metrics.contains_key(&definition.name) {
                return Err(ExporterError::config(format!(
                    "duplicate query name [{}]",
                    definition.name
                )));
            }

            let metric = QueryMetric::new(definition)?;
            metric.register(registry).map_err(|e| {
                ExporterError::config(format!(
                    "failed to register metric for query [{}]: {e}",
                    definition.name
                ))
            })?;

            debug!(query = %definition.name, metric = %definition.metric_name(), "registered query metric");
            metrics.insert(definition.name.clone(), metric);
        }

        Ok(Self { metrics })
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&QueryMetric> {
        self.metrics.get(name)
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.metrics.len()
    }
}
