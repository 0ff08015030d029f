mod build_info;
mod scraper;

pub use build_info::BuildInfoCollector;
pub use scraper::{ScrapeTimer, ScraperCollector};

use crate::client::Fetch;
use crate::collectors::Collector;
use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::Registry;
use std::sync::Arc;
use tracing::{debug, instrument};

/// The exporter's own series: build info plus per-collector scrape
/// bookkeeping. Opt-in.
#[derive(Clone, Default)]
pub struct ExporterCollector {
    build_info: BuildInfoCollector,
    scraper: Arc<ScraperCollector>,
}

impl ExporterCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared with the registry, which times every other collector with it.
    #[must_use]
    pub const fn get_scraper(&self) -> &Arc<ScraperCollector> {
        &self.scraper
    }
}

impl Collector for ExporterCollector {
    fn name(&self) -> &'static str {
        "exporter"
    }

    #[instrument(skip(self, registry), level = "info", err, fields(collector = "exporter"))]
    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        self.build_info.register_metrics(registry)?;
        self.scraper.register_metrics(registry)?;
        debug!(collector = "exporter", "registered exporter metrics");
        Ok(())
    }

    fn collect<'a>(&'a self, client: &'a dyn Fetch) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            futures::try_join!(self.build_info.collect(client), self.scraper.collect(client))?;
            Ok(())
        })
    }
}
