use crate::client::Fetch;
use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::Registry;
use std::collections::HashMap;

#[macro_use]
mod register_macro;

/// A scrape-driven collector: runs once per `/metrics` request.
pub trait Collector {
    fn name(&self) -> &'static str;

    /// Register metrics with the prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if any metric fails to register.
    fn register_metrics(&self, registry: &Registry) -> Result<()>;

    fn collect<'a>(&'a self, client: &'a dyn Fetch) -> BoxFuture<'a, Result<()>>;

    fn enabled_by_default(&self) -> bool {
        false
    }
}

pub mod util;

register_collectors! {
    stats => StatsCollector,
    exporter => ExporterCollector,
}

pub mod config;
pub mod registry;
