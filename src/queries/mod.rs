//! Periodic RQL queries published as `ravendb_queryresult_<name>` gauges.
//!
//! Definitions are loaded once at startup ([`load_queries`]), each gets its
//! own gauge registered before any polling starts ([`QueryMetrics`]), and a
//! [`QueryRunner`] drives one independent polling task per definition.

pub mod collector;
pub mod loader;
pub mod metric;

pub use collector::{QueryCollector, QueryRunner};
pub use loader::load_queries;
pub use metric::{QueryMetric, QueryMetrics};

use crate::error::ExporterError;
use crate::json::JsonPath;
use prometheus::Registry;
use std::time::Duration;
use tracing::debug;
use url::form_urlencoded;

pub const METRIC_PREFIX: &str = "ravendb_queryresult_";

/// A validated query definition.
#[derive(Clone, Debug)]
pub struct QueryDefinition {
    pub name: String,
    pub rql: String,
    pub database: String,
    pub value_on_error: f64,
    pub value_field: JsonPath,
    pub label_fields: Vec<JsonPath>,
    /// Prometheus label names derived from `label_fields`, same order.
    pub label_names: Vec<String>,
    pub interval: Duration,
}

impl QueryDefinition {
    #[must_use]
    pub fn metric_name(&self) -> String {
        format!("{METRIC_PREFIX}{}", self.name)
    }

    /// Request path of the query, with the statement form-urlencoded.
    #[must_use]
    pub fn path(&self) -> String {
        let query: String = form_urlencoded::byte_serialize(self.rql.as_bytes()).collect();
        format!(
            "/databases/{}/queries?query={query}&start=0&pageSize=101&metadataOnly=false",
            self.database
        )
    }
}

/// Turn a label-field path into a valid Prometheus label name:
/// `Address.City` becomes `Address_City`.
#[must_use]
pub fn label_name(field: &str) -> String {
    let mut name: String = field
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Register a gauge for every definition and pair each definition with it.
///
/// # Errors
///
/// Returns a configuration error if any gauge cannot be registered.
pub fn prepare(
    definitions: Vec<QueryDefinition>,
    registry: &Registry,
) -> Result<Vec<QueryCollector>, ExporterError> {
    let metrics = QueryMetrics::register(&definitions, registry)?;
    debug!(queries = metrics.len(), "query metrics registered");

    definitions
        .into_iter()
        .map(|definition| {
            let metric = metrics.get(&definition.name).cloned().ok_or_else(|| {
                ExporterError::config(format!("no metric registered for query [{}]", definition.name))
            })?;
            Ok(QueryCollector::new(definition, metric))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{QueryDefinition, label_name};
    use crate::json::JsonPath;
    use std::str::FromStr;
    use std::time::Duration;

    /// A definition as the loader would produce it.
    pub fn definition(name: &str, value_field: &str, label_fields: &[&str]) -> QueryDefinition {
        QueryDefinition {
            name: name.to_string(),
            rql: "from Orders".to_string(),
            database: "Northwind".to_string(),
            value_on_error: -1.0,
            value_field: JsonPath::from_str(value_field).unwrap_or_default(),
            label_fields: label_fields
                .iter()
                .map(|f| JsonPath::from_str(f).unwrap_or_default())
                .collect(),
            label_names: label_fields.iter().map(|f| label_name(f)).collect(),
            interval: Duration::from_secs(30),
        }
    }
}
