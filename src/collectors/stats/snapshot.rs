use crate::client::Fetch;
use crate::collectors::util::is_database_excluded;
use crate::error::ExporterError;
use crate::json::{self, JsonPath};
use futures::future::try_join_all;
use futures::try_join;
use serde_json::Value;
use tracing::debug;

pub const CPU_STATS_PATH: &str = "/admin/debug/cpu/stats";
pub const MEMORY_STATS_PATH: &str = "/admin/debug/memory/stats";
pub const NODE_INFO_PATH: &str = "/cluster/node-info";
pub const SERVER_METRICS_PATH: &str = "/admin/metrics";
pub const DATABASES_PATH: &str = "/databases";

/// Raw documents fetched during one scrape cycle.
#[derive(Clone, Debug, Default)]
pub struct StatsSnapshot {
    pub cpu: Vec<u8>,
    pub memory: Vec<u8>,
    pub node_info: Vec<u8>,
    pub metrics: Vec<u8>,
    pub databases: Vec<DatabaseStats>,
}

/// Stats and metrics documents of a single database, identified by name.
#[derive(Clone, Debug, Default)]
pub struct DatabaseStats {
    pub name: String,
    pub stats: Vec<u8>,
    pub metrics: Vec<u8>,
}

/// Fetch every document of a scrape cycle concurrently.
///
/// # Errors
///
/// Any failed request (or an unreadable database list) fails the whole
/// snapshot; partial snapshots are never returned.
pub async fn fetch(client: &dyn Fetch) -> Result<StatsSnapshot, ExporterError> {
    let (cpu, memory, node_info, metrics, databases) = try_join!(
        client.get(CPU_STATS_PATH),
        client.get(MEMORY_STATS_PATH),
        client.get(NODE_INFO_PATH),
        client.get(SERVER_METRICS_PATH),
        fetch_databases(client),
    )?;

    Ok(StatsSnapshot {
        cpu,
        memory,
        node_info,
        metrics,
        databases,
    })
}

async fn fetch_databases(client: &dyn Fetch) -> Result<Vec<DatabaseStats>, ExporterError> {
    let list = client.get(DATABASES_PATH).await?;
    let names = database_names(&list)?;

    try_join_all(
        names
            .into_iter()
            .filter(|name| {
                let excluded = is_database_excluded(name);
                if excluded {
                    debug!(database = %name, "skipping excluded database");
                }
                !excluded
            })
            .map(|name| async move {
                let stats_path = format!("/databases/{name}/stats");
                let metrics_path = format!("/databases/{name}/metrics");
                let (stats, metrics) =
                    try_join!(client.get(&stats_path), client.get(&metrics_path))?;
                Ok::<_, ExporterError>(DatabaseStats {
                    name,
                    stats,
                    metrics,
                })
            }),
    )
    .await
}

/// Names listed under `Databases[*].Name`; entries without a name are skipped.
///
/// # Errors
///
/// Returns a parse error when the document is not JSON or has no
/// `Databases` array.
pub fn database_names(list: &[u8]) -> Result<Vec<String>, ExporterError> {
    let doc = json::parse(list).ok_or_else(|| ExporterError::parse("database list is not valid JSON"))?;
    let entries = json::lookup(&doc, &JsonPath::keys(&["Databases"]))
        .and_then(Value::as_array)
        .ok_or_else(|| ExporterError::parse("database list has no 'Databases' array"))?;

    let name = JsonPath::keys(&["Name"]);
    Ok(entries
        .iter()
        .filter_map(|entry| json::extract_value::<String>(entry, &name))
        .collect())
}
