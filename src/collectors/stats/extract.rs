//! Pure extraction of metric values from a [`StatsSnapshot`].
//!
//! Missing or mistyped numeric fields read as zero.

use super::snapshot::{DatabaseStats, StatsSnapshot};
use crate::json::{self, JsonPath};
use crate::timespan::parse_timespan;

fn number(buffer: &[u8], path: &[&str]) -> f64 {
    json::extract::<f64>(buffer, &JsonPath::keys(path)).unwrap_or(0.0)
}

#[must_use]
pub fn memory_working_set(snapshot: &StatsSnapshot) -> f64 {
    number(&snapshot.memory, &["WorkingSet"])
}

/// Processor time of the last `CpuStats` entry, in seconds.
#[must_use]
pub fn cpu_time(snapshot: &StatsSnapshot) -> f64 {
    let field = JsonPath::keys(&["TotalProcessorTime"]);
    let mut total_processor_time = String::new();
    json::for_each_in_array(&snapshot.cpu, &JsonPath::keys(&["CpuStats"]), |entry| {
        total_processor_time = json::extract_value::<String>(entry, &field).unwrap_or_default();
    });

    parse_timespan(&total_processor_time)
}

#[must_use]
pub fn is_leader(snapshot: &StatsSnapshot) -> f64 {
    match json::extract::<String>(&snapshot.node_info, &JsonPath::keys(&["CurrentState"])) {
        Some(state) if state == "Leader" => 1.0,
        _ => 0.0,
    }
}

#[must_use]
pub fn request_total(snapshot: &StatsSnapshot) -> f64 {
    number(&snapshot.metrics, &["Requests", "RequestsPerSec", "Count"])
}

#[must_use]
pub fn document_put_total(snapshot: &StatsSnapshot) -> f64 {
    number(&snapshot.metrics, &["Docs", "PutsPerSec", "Count"])
}

#[must_use]
pub fn document_put_bytes_total(snapshot: &StatsSnapshot) -> f64 {
    number(&snapshot.metrics, &["Docs", "BytesPutsPerSec", "Count"])
}

#[must_use]
pub fn map_index_indexed_total(snapshot: &StatsSnapshot) -> f64 {
    number(&snapshot.metrics, &["MapIndexes", "MappedPerSec", "Count"])
}

#[must_use]
pub fn map_reduce_index_mapped_total(snapshot: &StatsSnapshot) -> f64 {
    number(&snapshot.metrics, &["MapReduceIndexes", "MappedPerSec", "Count"])
}

#[must_use]
pub fn map_reduce_index_reduced_total(snapshot: &StatsSnapshot) -> f64 {
    number(&snapshot.metrics, &["MapReduceIndexes", "ReducedPerSec", "Count"])
}

#[must_use]
pub fn database_documents(db: &DatabaseStats) -> f64 {
    number(&db.stats, &["CountOfDocuments"])
}

#[must_use]
pub fn database_indexes(db: &DatabaseStats) -> f64 {
    number(&db.stats, &["CountOfIndexes"])
}

/// Number of `Indexes` entries flagged `IsStale`.
#[must_use]
pub fn database_stale_indexes(db: &DatabaseStats) -> f64 {
    let is_stale = JsonPath::keys(&["IsStale"]);
    let mut count: u32 = 0;
    json::for_each_in_array(&db.stats, &JsonPath::keys(&["Indexes"]), |index| {
        if json::extract_value::<bool>(index, &is_stale) == Some(true) {
            count += 1;
        }
    });

    f64::from(count)
}

#[must_use]
pub fn database_size(db: &DatabaseStats) -> f64 {
    number(&db.stats, &["SizeOnDisk", "SizeInBytes"])
}

#[must_use]
pub fn database_request_total(db: &DatabaseStats) -> f64 {
    number(&db.metrics, &["Requests", "RequestsPerSec", "Count"])
}

#[must_use]
pub fn database_document_put_total(db: &DatabaseStats) -> f64 {
    number(&db.metrics, &["Docs", "PutsPerSec", "Count"])
}

#[must_use]
pub fn database_document_put_bytes(db: &DatabaseStats) -> f64 {
    number(&db.metrics, &["Docs", "BytesPutsPerSec", "Count"])
}

#[must_use]
pub fn database_map_index_indexed_total(db: &DatabaseStats) -> f64 {
    number(&db.metrics, &["MapIndexes", "IndexedPerSec", "Count"])
}

#[must_use]
pub fn database_map_reduce_index_mapped_total(db: &DatabaseStats) -> f64 {
    number(&db.metrics, &["MapReduceIndexes", "MappedPerSec", "Count"])
}

#[must_use]
pub fn database_map_reduce_index_reduced_total(db: &DatabaseStats) -> f64 {
    number(&db.metrics, &["MapReduceIndexes", "ReducedPerSec", "Count"])
}
