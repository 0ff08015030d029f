use crate::client::Fetch;
use crate::collectors::Collector;
use crate::error::ExporterError;
use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::core::{Collector as PrometheusCollector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Counter, CounterVec, Gauge, GaugeVec, Opts, Registry};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, instrument};

pub mod extract;
pub mod snapshot;

pub use snapshot::{DatabaseStats, StatsSnapshot};

pub const NAMESPACE: &str = "ravendb";
const DATABASE_LABEL: &str = "database";

/// Server-wide and per-database statistics (default-on).
///
/// A failed scrape exposes only `ravendb_up = 0`; every other series from
/// this collector is withheld until the next successful scrape.
#[derive(Clone)]
pub struct StatsCollector {
    metrics: StatsMetrics,
}

/// Metric handles plus the outcome of the last scrape. Registered as a single
/// prometheus collector so the exposition can be gated on that outcome.
#[derive(Clone)]
struct StatsMetrics {
    up: Gauge,
    working_set: Gauge,
    cpu_time: Counter,
    is_leader: Gauge,
    request_total: Counter,
    document_put_total: Counter,
    document_put_bytes: Counter,
    map_index_indexed_total: Counter,
    map_reduce_index_mapped_total: Counter,
    map_reduce_index_reduced_total: Counter,

    database_documents: GaugeVec,
    database_indexes: GaugeVec,
    database_stale_indexes: GaugeVec,
    database_size: GaugeVec,

    database_request_total: CounterVec,
    database_document_put_total: CounterVec,
    database_document_put_bytes: CounterVec,
    database_map_index_indexed_total: CounterVec,
    database_map_reduce_index_mapped_total: CounterVec,
    database_map_reduce_index_reduced_total: CounterVec,

    healthy: Arc<AtomicBool>,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCollector {
    #[must_use]
    #[allow(clippy::expect_used)]
    /// Create a new stats collector.
    ///
    /// # Panics
    ///
    /// Panics if metric opts are invalid (should never happen with static names).
    pub fn new() -> Self {
        let opts = |name: &str, help: &str| Opts::new(name, help).namespace(NAMESPACE);
        let g = |name: &str, help: &str| Gauge::with_opts(opts(name, help)).expect("valid metric name");
        let c = |name: &str, help: &str| Counter::with_opts(opts(name, help)).expect("valid metric name");
        let gv = |name: &str, help: &str| {
            GaugeVec::new(opts(name, help), &[DATABASE_LABEL]).expect("valid metric name")
        };
        let cv = |name: &str, help: &str| {
            CounterVec::new(opts(name, help), &[DATABASE_LABEL]).expect("valid metric name")
        };

        Self {
            metrics: StatsMetrics {
                up: g("up", "Whether the RavenDB scrape was successful"),
                working_set: g("working_set_bytes", "Process working set"),
                cpu_time: c("cpu_time_seconds_total", "CPU time"),
                is_leader: g(
                    "is_leader",
                    "If 1, then node is the cluster leader, otherwise 0",
                ),
                request_total: c("request_total", "Server-wide request count"),
                document_put_total: c("document_put_total", "Server-wide document puts count"),
                document_put_bytes: c(
                    "document_put_bytes_total",
                    "Server-wide document put bytes",
                ),
                map_index_indexed_total: c(
                    "mapindex_indexed_total",
                    "Server-wide map index indexed count",
                ),
                map_reduce_index_mapped_total: c(
                    "mapreduceindex_mapped_total",
                    "Server-wide map-reduce index mapped count",
                ),
                map_reduce_index_reduced_total: c(
                    "mapreduceindex_reduced_total",
                    "Server-wide map-reduce index reduced count",
                ),

                database_documents: gv("database_documents", "Count of documents in a database"),
                database_indexes: gv("database_indexes", "Count of indexes in a database"),
                database_stale_indexes: gv(
                    "database_stale_indexes",
                    "Count of stale indexes in a database",
                ),
                database_size: gv("database_size_bytes", "Database size in bytes"),

                database_request_total: cv("database_request_total", "Database request count"),
                database_document_put_total: cv(
                    "database_document_put_total",
                    "Database document puts count",
                ),
                database_document_put_bytes: cv(
                    "database_document_put_bytes_total",
                    "Database document put bytes",
                ),
                database_map_index_indexed_total: cv(
                    "database_mapindex_indexed_total",
                    "Database map index indexed count",
                ),
                database_map_reduce_index_mapped_total: cv(
                    "database_mapreduceindex_mapped_total",
                    "Database map-reduce index mapped count",
                ),
                database_map_reduce_index_reduced_total: cv(
                    "database_mapreduceindex_reduced_total",
                    "Database map-reduce index reduced count",
                ),

                healthy: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    /// Fetch every document of one cycle.
    ///
    /// # Errors
    ///
    /// Returns the first transport or parse failure; no partial snapshot.
    pub async fn scrape(&self, client: &dyn Fetch) -> Result<StatsSnapshot, ExporterError> {
        snapshot::fetch(client).await
    }

    /// Publish the values of a successful scrape.
    pub fn publish(&self, snapshot: &StatsSnapshot) {
        self.metrics.publish(snapshot);
    }

    /// Record a failed scrape: `up = 0`, everything else withheld.
    pub fn mark_down(&self) {
        self.metrics.up.set(0.0);
        self.metrics.healthy.store(false, Ordering::Relaxed);
    }
}

impl StatsMetrics {
    fn publish(&self, snapshot: &StatsSnapshot) {
        self.up.set(1.0);
        self.healthy.store(true, Ordering::Relaxed);

        self.working_set.set(extract::memory_working_set(snapshot));
        add(&self.cpu_time, extract::cpu_time(snapshot));
        self.is_leader.set(extract::is_leader(snapshot));

        add(&self.request_total, extract::request_total(snapshot));
        add(&self.document_put_total, extract::document_put_total(snapshot));
        add(&self.document_put_bytes, extract::document_put_bytes_total(snapshot));
        add(&self.map_index_indexed_total, extract::map_index_indexed_total(snapshot));
        add(
            &self.map_reduce_index_mapped_total,
            extract::map_reduce_index_mapped_total(snapshot),
        );
        add(
            &self.map_reduce_index_reduced_total,
            extract::map_reduce_index_reduced_total(snapshot),
        );

        let dbs = &snapshot.databases;
        set_per_database(dbs, &self.database_documents, extract::database_documents);
        set_per_database(dbs, &self.database_indexes, extract::database_indexes);
        set_per_database(dbs, &self.database_stale_indexes, extract::database_stale_indexes);
        set_per_database(dbs, &self.database_size, extract::database_size);

        add_per_database(dbs, &self.database_request_total, extract::database_request_total);
        add_per_database(
            dbs,
            &self.database_document_put_total,
            extract::database_document_put_total,
        );
        add_per_database(
            dbs,
            &self.database_document_put_bytes,
            extract::database_document_put_bytes,
        );
        add_per_database(
            dbs,
            &self.database_map_index_indexed_total,
            extract::database_map_index_indexed_total,
        );
        add_per_database(
            dbs,
            &self.database_map_reduce_index_mapped_total,
            extract::database_map_reduce_index_mapped_total,
        );
        add_per_database(
            dbs,
            &self.database_map_reduce_index_reduced_total,
            extract::database_map_reduce_index_reduced_total,
        );

        debug!(databases = dbs.len(), "published stats");
    }

    fn handles(&self) -> [&dyn PrometheusCollector; 20] {
        [
            &self.up,
            &self.working_set,
            &self.cpu_time,
            &self.is_leader,
            &self.request_total,
            &self.document_put_total,
            &self.document_put_bytes,
            &self.map_index_indexed_total,
            &self.map_reduce_index_mapped_total,
            &self.map_reduce_index_reduced_total,
            &self.database_documents,
            &self.database_indexes,
            &self.database_stale_indexes,
            &self.database_size,
            &self.database_request_total,
            &self.database_document_put_total,
            &self.database_document_put_bytes,
            &self.database_map_index_indexed_total,
            &self.database_map_reduce_index_mapped_total,
            &self.database_map_reduce_index_reduced_total,
        ]
    }
}

impl PrometheusCollector for StatsMetrics {
    fn desc(&self) -> Vec<&Desc> {
        self.handles().into_iter().flat_map(|h| h.desc()).collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        if !self.healthy.load(Ordering::Relaxed) {
            return self.up.collect();
        }
        self.handles().into_iter().flat_map(|h| h.collect()).collect()
    }
}

/// Counters only move forward; negative or NaN readings are dropped.
fn add(counter: &Counter, value: f64) {
    if value > 0.0 {
        counter.inc_by(value);
    }
}

fn set_per_database(dbs: &[DatabaseStats], vec: &GaugeVec, value: fn(&DatabaseStats) -> f64) {
    for db in dbs {
        vec.with_label_values(&[db.name.as_str()]).set(value(db));
    }
}

fn add_per_database(dbs: &[DatabaseStats], vec: &CounterVec, value: fn(&DatabaseStats) -> f64) {
    for db in dbs {
        add(&vec.with_label_values(&[db.name.as_str()]), value(db));
    }
}

impl Collector for StatsCollector {
    fn name(&self) -> &'static str {
        "stats"
    }

    #[instrument(
        skip(self, registry),
        level = "info",
        err,
        fields(collector = "stats")
    )]
    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.metrics.clone()))?;
        Ok(())
    }

    #[instrument(skip(self, client), level = "info", fields(collector = "stats", otel.kind = "internal"))]
    fn collect<'a>(&'a self, client: &'a dyn Fetch) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            match self.scrape(client).await {
                Ok(snapshot) => {
                    self.publish(&snapshot);
                    Ok(())
                }
                Err(e) => {
                    error!(collector = "stats", error = %e, "error while getting data from RavenDB");
                    self.mark_down();
                    Err(e.into())
                }
            }
        })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}
