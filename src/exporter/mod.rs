//! HTTP surface: `/metrics`, `/health` and a landing page, plus the
//! background query collectors that share the same registry.

mod handlers;

use crate::client::{Fetch, HttpClient};
use crate::collectors::{config::CollectorConfig, registry::CollectorRegistry};
use crate::queries::{self, QueryRunner, load_queries};
use anyhow::{Context, Result};
use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, header},
    routing::get,
};
use secrecy::SecretString;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn};
use ulid::Ulid;

/// Everything the exporter needs to run, resolved from CLI flags and env.
#[derive(Debug)]
pub struct ExporterOptions {
    pub port: u16,
    pub listen: Option<String>,
    pub url: SecretString,
    pub timeout: Duration,
    pub collectors: Vec<String>,
    pub queries_dir: Option<PathBuf>,
}

#[derive(Clone)]
pub(crate) struct AppState {
    collectors: Arc<CollectorRegistry>,
    client: Arc<dyn Fetch>,
}

/// Start the exporter and serve until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the URL is invalid, a query definition is invalid,
/// a query metric cannot be registered or the listener cannot be bound.
pub async fn new(options: ExporterOptions) -> Result<()> {
    let client = HttpClient::new(&options.url, options.timeout)?;
    info!(url = %client.redacted_url(), timeout = ?options.timeout, "RavenDB target");

    let definitions = load_queries(options.queries_dir.as_deref())?;

    let config = CollectorConfig::new().with_enabled(&options.collectors);
    let collectors = CollectorRegistry::new(&config);
    let query_collectors = queries::prepare(definitions, collectors.registry())?;

    let client: Arc<dyn Fetch> = Arc::new(client);
    let cancel = CancellationToken::new();
    let runner = QueryRunner::spawn(query_collectors, Arc::clone(&client), cancel.child_token());

    let app = router(AppState {
        collectors: Arc::new(collectors),
        client,
    });

    let listener = bind(options.port, options.listen.as_deref()).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    runner.shutdown().await;

    info!("exporter stopped");

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUlid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    info_span!(
                        "http.server.request",
                        http.method = %request.method(),
                        url.path = %request.uri().path(),
                        request_id,
                        otel.kind = "server"
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::SERVER,
            HeaderValue::from_static(concat!("ravendb_exporter/", env!("CARGO_PKG_VERSION"))),
        ))
        .with_state(state)
}

#[derive(Clone, Copy, Default)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = HeaderValue::from_str(&Ulid::new().to_string()).ok()?;
        Some(RequestId::new(id))
    }
}

/// Bind the explicit `listen` address, or `[::]` falling back to `0.0.0.0`.
async fn bind(port: u16, listen: Option<&str>) -> Result<TcpListener> {
    if let Some(listen) = listen {
        let ip: IpAddr = listen
            .trim_matches(|c| c == '[' || c == ']')
            .parse()
            .with_context(|| format!("invalid listen address: {listen}"))?;

        return TcpListener::bind(SocketAddr::new(ip, port))
            .await
            .with_context(|| format!("failed to bind {ip}:{port}"));
    }

    match TcpListener::bind(SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)).await {
        Ok(listener) => Ok(listener),
        Err(e) => {
            warn!(error = %e, "IPv6 bind failed, falling back to IPv4");
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
                .await
                .with_context(|| format!("failed to bind 0.0.0.0:{port}"))
        }
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
        () = cancel.cancelled() => {}
    }

    cancel.cancel();
}
