use crate::built_info;
use crate::client::Fetch;
use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::{GaugeVec, Opts, Registry};

/// `ravendb_exporter_build_info{version, commit} 1`
#[derive(Clone)]
pub struct BuildInfoCollector {
    build_info: GaugeVec,
}

impl Default for BuildInfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildInfoCollector {
    #[must_use]
    #[allow(clippy::expect_used)]
    /// Create the build info gauge.
    ///
    /// # Panics
    ///
    /// Panics if metric creation fails.
    pub fn new() -> Self {
        let build_info = GaugeVec::new(
            Opts::new(
                "ravendb_exporter_build_info",
                "Version and commit of the running exporter",
            ),
            &["version", "commit"],
        )
        .expect("ravendb_exporter_build_info");

        Self { build_info }
    }
}

impl crate::collectors::Collector for BuildInfoCollector {
    fn name(&self) -> &'static str {
        "build_info"
    }

    fn register_metrics(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.build_info.clone()))?;

        self.build_info
            .with_label_values(&[
                built_info::PKG_VERSION,
                built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown"),
            ])
            .set(1.0);

        Ok(())
    }

    fn collect<'a>(&'a self, _client: &'a dyn Fetch) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { Ok(()) })
    }
}
