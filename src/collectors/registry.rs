use crate::client::Fetch;
use crate::collectors::{
    Collector, CollectorType, all_factories, config::CollectorConfig, exporter::ScraperCollector,
};
use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;
use tracing::{debug, info, info_span, instrument, warn};
use tracing_futures::Instrument as _;

/// The enabled scrape-driven collectors and the registry they publish into.
#[derive(Clone)]
pub struct CollectorRegistry {
    collectors: Vec<CollectorType>,
    registry: Arc<Registry>,
    scraper: Option<Arc<ScraperCollector>>,
}

impl CollectorRegistry {
    /// Instantiate and register every collector enabled in `config`.
    ///
    /// A collector whose metrics fail to register is logged and skipped.
    #[must_use]
    pub fn new(config: &CollectorConfig) -> Self {
        Self::with_registry(config, Registry::new())
    }

    /// Same as [`CollectorRegistry::new`] but publishing into an existing
    /// registry (shared with the query collectors).
    #[must_use]
    pub fn with_registry(config: &CollectorConfig, registry: Registry) -> Self {
        let factories = all_factories();
        let mut collectors = Vec::new();
        let mut scraper = None;

        for name in config.unknown() {
            warn!(collector = name, "unknown collector, ignoring");
        }

        for name in crate::collectors::COLLECTOR_NAMES {
            if !config.is_enabled(name) {
                continue;
            }

            let Some(factory) = factories.get(name) else {
                continue;
            };

            let collector = factory();

            if let Err(e) = collector.register_metrics(&registry) {
                warn!(collector = name, error = %e, "failed to register collector, skipping");
                continue;
            }

            if let Some(s) = collector.get_scraper() {
                scraper = Some(s);
            }

            info!(collector = name, "collector enabled");
            collectors.push(collector);
        }

        Self {
            collectors,
            registry: Arc::new(registry),
            scraper,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(Collector::name).collect()
    }

    /// Run every collector once, then encode the registry in the text
    /// exposition format.
    ///
    /// A failing collector is logged and recorded by the scraper; its
    /// remaining output is still encoded.
    ///
    /// # Errors
    ///
    /// Returns an error only if encoding fails.
    #[instrument(skip(self, client), level = "info", fields(otel.kind = "internal"))]
    pub async fn collect_all(&self, client: &dyn Fetch) -> Result<String> {
        let mut tasks = FuturesUnordered::new();

        for collector in &self.collectors {
            let span = info_span!("collector.collect", collector = collector.name());
            let timer = self
                .scraper
                .as_ref()
                .map(|s| s.start_scrape(collector.name()));

            tasks.push(
                async move {
                    let res = collector.collect(client).await;
                    (collector.name(), res, timer)
                }
                .instrument(span),
            );
        }

        while let Some((name, res, timer)) = tasks.next().await {
            match res {
                Ok(()) => {
                    debug!(collector = name, "collector finished");
                    if let Some(t) = timer {
                        t.success();
                    }
                }
                Err(e) => {
                    // The collector logs its own failure.
                    debug!(collector = name, error = %e, "collector failed");
                    if let Some(t) = timer {
                        t.error();
                    }
                }
            }
        }

        if let Some(scraper) = &self.scraper {
            scraper.increment_scrapes();
        }

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        let text = String::from_utf8(buffer)?;

        // Reported on the next scrape.
        if let Some(scraper) = &self.scraper {
            let samples = text.lines().filter(|l| !l.starts_with('#')).count();
            scraper.update_metrics_count(i64::try_from(samples).unwrap_or(i64::MAX));
        }

        Ok(text)
    }
}
