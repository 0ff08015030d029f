use super::{QueryDefinition, QueryMetric};
use crate::client::Fetch;
use crate::error::ExporterError;
use crate::json::{self, JsonPath};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};
use tracing_futures::Instrument as _;

/// One labeled value extracted from a result row.
type Row = (Vec<String>, f64);

/// Polls one query definition and publishes its rows.
#[derive(Clone)]
pub struct QueryCollector {
    definition: QueryDefinition,
    metric: QueryMetric,
}

impl QueryCollector {
    #[must_use]
    pub const fn new(definition: QueryDefinition, metric: QueryMetric) -> Self {
        Self { definition, metric }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    #[must_use]
    pub const fn definition(&self) -> &QueryDefinition {
        &self.definition
    }

    /// Run a single cycle: fetch, then publish every row, or the fallback
    /// value if anything failed.
    ///
    /// # Errors
    ///
    /// Returns the transport or parse error of a failed cycle, after the
    /// fallback has been published.
    pub async fn run_once(&self, client: &dyn Fetch) -> Result<usize, ExporterError> {
        let name = self.name();

        match self.read(client).await {
            Ok(rows) => {
                let count = rows.len();
                for (labels, value) in &rows {
                    self.metric.set(labels, *value);
                }
                info!(query = name, rows = count, "metrics from query collected");
                Ok(count)
            }
            Err(e) => {
                error!(query = name, error = %e, "error while executing query");
                self.metric.set_fallback(self.definition.value_on_error);
                Err(e)
            }
        }
    }

    /// Poll until `cancel` fires. Both the in-flight request and the sleep
    /// between cycles stop on cancellation.
    pub async fn run(self, client: Arc<dyn Fetch>, cancel: CancellationToken) {
        let interval = self.definition.interval;

        loop {
            debug!(query = self.name(), "running query");

            tokio::select! {
                () = cancel.cancelled() => break,
                _ = self.run_once(client.as_ref()) => {}
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        debug!(query = self.name(), "query collector stopped");
    }

    async fn read(&self, client: &dyn Fetch) -> Result<Vec<Row>, ExporterError> {
        let path = self.definition.path();
        let body = client.get(&path).await?;

        let document = json::parse(&body)
            .ok_or_else(|| ExporterError::parse("query response is not valid JSON"))?;

        let results = json::lookup(&document, &JsonPath::keys(&["Results"]))
            .and_then(Value::as_array)
            .ok_or_else(|| ExporterError::parse("query response has no Results array"))?;

        results.iter().map(|row| self.extract_row(row)).collect()
    }

    fn extract_row(&self, row: &Value) -> Result<Row, ExporterError> {
        let value = json::extract_value::<f64>(row, &self.definition.value_field).ok_or_else(|| {
            ExporterError::parse(format!(
                "cannot read metric value '{}' from result row",
                self.definition.value_field
            ))
        })?;

        let labels = self
            .definition
            .label_fields
            .iter()
            .map(|field| {
                json::extract_value::<String>(row, field).ok_or_else(|| {
                    ExporterError::parse(format!("cannot read metric label '{field}' from result row"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((labels, value))
    }
}

/// Owns one polling task per query and the token that stops them.
pub struct QueryRunner {
    tasks: JoinSet<()>,
    cancel: CancellationToken,
}

impl QueryRunner {
    /// Spawn a task for every collector. The tasks stop when `cancel` (or a
    /// parent of it) is cancelled, or on [`QueryRunner::shutdown`].
    #[must_use]
    pub fn spawn(
        collectors: Vec<QueryCollector>,
        client: Arc<dyn Fetch>,
        cancel: CancellationToken,
    ) -> Self {
        let mut tasks = JoinSet::new();

        for collector in collectors {
            let span = info_span!("query.run", query = %collector.name(), otel.kind = "internal");
            let client = Arc::clone(&client);
            let cancel = cancel.clone();
            tasks.spawn(collector.run(client, cancel).instrument(span));
        }

        info!(queries = tasks.len(), "query collectors started");

        Self { tasks, cancel }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel every task and wait for all of them to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();

        while let Some(res) = self.tasks.join_next().await {
            if let Err(e) = res {
                warn!(error = %e, "query collector task failed");
            }
        }

        debug!("query collectors stopped");
    }
}
