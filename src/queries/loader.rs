use super::{QueryDefinition, label_name};
use crate::error::ExporterError;
use crate::json::JsonPath;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// One entry of a query file, before validation.
#[derive(Debug, Default, Deserialize)]
struct RawQuery {
    #[serde(default, alias = "Name")]
    name: String,
    #[serde(default, alias = "RQL")]
    rql: String,
    #[serde(default, alias = "Database")]
    database: String,
    #[serde(default, rename = "value-on-error")]
    value_on_error: f64,
    #[serde(default, rename = "value-field")]
    value_field: String,
    #[serde(default, rename = "label-fields")]
    label_fields: Vec<String>,
    #[serde(default, alias = "Interval", deserialize_with = "interval")]
    interval: Option<Duration>,
}

/// A humantime string (`30s`, `1m 30s`) or a bare integer of nanoseconds.
fn interval<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Interval {
        Nanos(u64),
        Text(#[serde(with = "humantime_serde")] Duration),
    }

    Ok(Option::<Interval>::deserialize(deserializer)?.map(|interval| match interval {
        Interval::Nanos(nanos) => Duration::from_nanos(nanos),
        Interval::Text(duration) => duration,
    }))
}

/// Load every query definition from `*.yml` / `*.yaml` files in `dir`.
///
/// No directory means no queries. Files are read in name order, and the first
/// invalid definition aborts the whole load.
///
/// # Errors
///
/// Returns a configuration error if the directory or a file cannot be read,
/// a file is not a YAML list of queries, or any definition is invalid.
pub fn load_queries(dir: Option<&Path>) -> Result<Vec<QueryDefinition>, ExporterError> {
    let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) else {
        info!("no queries directory configured");
        return Ok(Vec::new());
    };

    info!(dir = %dir.display(), "loading queries");

    let mut definitions: Vec<QueryDefinition> = Vec::new();

    for file in query_files(dir)? {
        debug!(file = %file.display(), "loading query file");

        let content = fs::read_to_string(&file).map_err(|e| {
            ExporterError::config(format!("failed to read {}: {e}", file.display()))
        })?;

        if content.trim().is_empty() {
            continue;
        }

        let raw: Option<Vec<RawQuery>> = serde_yaml::from_str(&content).map_err(|e| {
            ExporterError::config(format!("failed to parse {}: {e}", file.display()))
        })?;

        for query in raw.unwrap_or_default() {
            let definition = validate(query)?;

            if definitions.iter().any(|d| d.name == definition.name) {
                return Err(ExporterError::config(format!(
                    "duplicate query name [{}] in {}",
                    definition.name,
                    file.display()
                )));
            }

            definitions.push(definition);
        }
    }

    info!(count = definitions.len(), "queries loaded");

    Ok(definitions)
}

fn query_files(dir: &Path) -> Result<Vec<PathBuf>, ExporterError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        ExporterError::config(format!("failed to read queries directory {}: {e}", dir.display()))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == "yml" || ext == "yaml")
        })
        .collect();

    files.sort();

    Ok(files)
}

fn validate(raw: RawQuery) -> Result<QueryDefinition, ExporterError> {
    if raw.name.trim().is_empty() {
        return Err(ExporterError::config("query name missing"));
    }
    let name = raw.name;

    if !is_valid_name(&name) {
        return Err(ExporterError::config(format!(
            "query name [{name}] must only contain letters, digits, '_' or ':'"
        )));
    }
    if raw.database.trim().is_empty() {
        return Err(ExporterError::config(format!(
            "no database specified for query [{name}]"
        )));
    }
    if raw.rql.trim().is_empty() {
        return Err(ExporterError::config(format!(
            "RQL statement required for query [{name}]"
        )));
    }
    let Some(interval) = raw.interval.filter(|i| !i.is_zero()) else {
        return Err(ExporterError::config(format!(
            "interval must be greater than zero for query [{name}]"
        )));
    };
    if raw.value_field.trim().is_empty() {
        return Err(ExporterError::config(format!(
            "value-field required for query [{name}]"
        )));
    }

    let value_field: JsonPath = raw.value_field.parse().map_err(|e| {
        ExporterError::config(format!("invalid value-field for query [{name}]: {e}"))
    })?;

    let label_fields = raw
        .label_fields
        .iter()
        .map(|field| {
            field.parse::<JsonPath>().map_err(|e| {
                ExporterError::config(format!("invalid label-field for query [{name}]: {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let label_names = raw.label_fields.iter().map(|f| label_name(f)).collect();

    Ok(QueryDefinition {
        name,
        rql: raw.rql,
        database: raw.database,
        value_on_error: raw.value_on_error,
        value_field,
        label_fields,
        label_names,
        interval,
    })
}

/// The part after `ravendb_queryresult_` must keep the metric name valid.
fn is_valid_name(name: &str) -> bool {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"^[a-zA-Z0-9_:]+$").expect("Invalid regex")
    });

    re.is_match(name)
}
