use super::super::common::{MockRavenDb, sample};
use anyhow::Result;
use axum::http::StatusCode;
use prometheus::{Encoder, Registry, TextEncoder};
use ravendb_exporter::client::HttpClient;
use ravendb_exporter::error::ExporterError;
use ravendb_exporter::queries::{self, QueryCollector, load_queries};
use secrecy::SecretString;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const BY_REGION: &str = r"
- name: orders_by_region
  rql: from Orders group by ShipTo.Region select count() as value, ShipTo.Region as region
  database: Northwind
  value-on-error: -1
  value-field: value
  label-fields: [region]
  interval: 30s
";

fn exposition(registry: &Registry) -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

fn load(yaml: &str) -> Result<(TempDir, Registry, QueryCollector)> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("orders.yml"), yaml)?;

    let registry = Registry::new();
    let mut collectors = queries::prepare(load_queries(Some(dir.path()))?, &registry)?;
    let collector = collectors.pop().expect("one query defined");

    Ok((dir, registry, collector))
}

fn client(url: &str) -> Result<HttpClient> {
    Ok(HttpClient::new(
        &SecretString::from(url.to_string()),
        Duration::from_secs(2),
    )?)
}

#[tokio::test]
async fn test_rows_become_labeled_series() -> Result<()> {
    let (_dir, registry, collector) = load(BY_REGION)?;
    let server = MockRavenDb::default()
        .with(
            &collector.definition().path(),
            r#"{"TotalResults":2,"Results":[{"value":5,"region":"eu"},{"value":7,"region":"us"}]}"#,
        )
        .start()
        .await?;

    collector.run_once(&client(&server.url())?).await?;

    let text = exposition(&registry)?;
    assert_eq!(sample(&text, r#"ravendb_queryresult_orders_by_region{region="eu"}"#), Some(5.0));
    assert_eq!(sample(&text, r#"ravendb_queryresult_orders_by_region{region="us"}"#), Some(7.0));
    assert!(text.contains("# HELP ravendb_queryresult_orders_by_region Result of an RQL query orders_by_region"));
    Ok(())
}

#[tokio::test]
async fn test_failed_fetch_sets_fallback() -> Result<()> {
    let (_dir, registry, collector) = load(BY_REGION)?;
    let server = MockRavenDb::default()
        .with_status(
            &collector.definition().path(),
            StatusCode::SERVICE_UNAVAILABLE,
            "",
        )
        .start()
        .await?;

    let result = collector.run_once(&client(&server.url())?).await;
    assert!(matches!(result, Err(ExporterError::Transport { .. })));

    let text = exposition(&registry)?;
    assert_eq!(sample(&text, r#"ravendb_queryresult_orders_by_region{region=""}"#), Some(-1.0));
    Ok(())
}

#[tokio::test]
async fn test_statement_is_sent_form_encoded() -> Result<()> {
    let (_dir, _registry, collector) = load(BY_REGION)?;
    let server = MockRavenDb::default().start().await?;

    let _ = collector.run_once(&client(&server.url())?).await;

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].0,
        "/databases/Northwind/queries?query=from+Orders+group+by+ShipTo.Region+select+count%28%29+as+value%2C+ShipTo.Region+as+region&start=0&pageSize=101&metadataOnly=false"
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_database_fails_the_load() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("orders.yml"),
        "- {name: orders, rql: from Orders, value-field: Count, interval: 30s}\n",
    )?;

    let result = load_queries(Some(dir.path()));
    assert!(matches!(result, Err(ExporterError::Config(_))));
    Ok(())
}
