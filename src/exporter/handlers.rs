use super::AppState;
use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tracing::error;

/// Prometheus text exposition format.
pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn root() -> Html<&'static str> {
    Html(concat!(
        "<html><head><title>RavenDB Exporter</title></head><body>",
        "<h1>RavenDB Exporter</h1>",
        "<p>version ",
        env!("CARGO_PKG_VERSION"),
        "</p>",
        "<p><a href=\"/metrics\">Metrics</a></p>",
        "</body></html>"
    ))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.collectors.collect_all(state.client.as_ref()).await {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode metrics: {e}"),
            )
                .into_response()
        }
    }
}
