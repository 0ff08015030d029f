use crate::client::Fetch;
use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, IntCounter, IntGauge, Opts, Registry};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const DURATION_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Per-collector scrape timing and outcome, plus totals for the whole exporter.
#[derive(Clone)]
pub struct ScraperCollector {
    duration: HistogramVec,
    errors: CounterVec,
    last_timestamp: GaugeVec,
    last_success: GaugeVec,
    samples: IntGauge,
    scrapes: IntCounter,
}

impl Default for ScraperCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ScraperCollector {
    #[must_use]
    #[allow(clippy::expect_used)]
    /// # Panics
    ///
    /// Panics if metric creation fails.
    pub fn new() -> Self {
        let per_collector = |name: &str, help: &str| {
            GaugeVec::new(Opts::new(name, help), &["collector"]).expect("valid metric name")
        };

        Self {
            duration: HistogramVec::new(
                HistogramOpts::new(
                    "ravendb_exporter_collector_scrape_duration_seconds",
                    "Time spent running each collector",
                )
                .buckets(DURATION_BUCKETS.to_vec()),
                &["collector"],
            )
            .expect("valid metric name"),
            errors: CounterVec::new(
                Opts::new(
                    "ravendb_exporter_collector_scrape_errors_total",
                    "Failed runs per collector",
                ),
                &["collector"],
            )
            .expect("valid metric name"),
            last_timestamp: per_collector(
                "ravendb_exporter_collector_last_scrape_timestamp_seconds",
                "Unix time of the last run per collector",
            ),
            last_success: per_collector(
                "ravendb_exporter_collector_last_scrape_success",
                "Whether the last run of a collector succeeded (1) or failed (0)",
            ),
            samples: IntGauge::new(
                "ravendb_exporter_metrics_total",
                "Samples exposed by the previous scrape",
            )
            .expect("valid metric name"),
            scrapes: IntCounter::new(
                "ravendb_exporter_scrapes_total",
                "Scrapes of /metrics since start",
            )
            .expect("valid metric name"),
        }
    }

    /// Start timing a run of `collector`.
    #[must_use]
    pub fn start_scrape(&self, collector: &str) -> ScrapeTimer {
        ScrapeTimer {
            collector: collector.to_string(),
            start: Instant::now(),
            scraper: self.clone(),
            recorded: false,
        }
    }

    pub fn update_metrics_count(&self, count: i64) {
        self.samples.set(count);
    }

    pub fn increment_scrapes(&self) {
        self.scrapes.inc();
    }

    fn finish(&self, collector: &str, success: bool) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();

        self.last_timestamp.with_label_values(&[collector]).set(now);
        self.last_success
            .with_label_values(&[collector])
            .set(if success { 1.0 } else { 0.0 });

        if !success {
            self.errors.with_label_values(&[collector]).inc();
        }
    }

    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.duration.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        registry.register(Box::new(self.last_timestamp.clone()))?;
        registry.register(Box::new(self.last_success.clone()))?;
        registry.register(Box::new(self.samples.clone()))?;
        registry.register(Box::new(self.scrapes.clone()))?;
        Ok(())
    }
}

impl crate::collectors::Collector for ScraperCollector {
    fn name(&self) -> &'static str {
        "scraper"
    }

    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        self.register(registry)
    }

    // Fed by CollectorRegistry::collect_all, nothing to fetch.
    fn collect<'a>(&'a self, _client: &'a dyn Fetch) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { Ok(()) })
    }
}

/// Records the outcome of one collector run. Dropping it without calling
/// [`ScrapeTimer::error`] counts as a success.
pub struct ScrapeTimer {
    collector: String,
    start: Instant,
    scraper: ScraperCollector,
    recorded: bool,
}

impl ScrapeTimer {
    pub fn success(mut self) {
        self.record(true);
    }

    /// Failed runs count an error and are left out of the duration histogram.
    pub fn error(mut self) {
        self.record(false);
    }

    fn record(&mut self, success: bool) {
        if success {
            self.scraper
                .duration
                .with_label_values(&[self.collector.as_str()])
                .observe(self.start.elapsed().as_secs_f64());
        }
        self.scraper.finish(&self.collector, success);
        self.recorded = true;
    }
}

impl Drop for ScrapeTimer {
    fn drop(&mut self) {
        if !self.recorded {
            self.record(true);
        }
    }
}
