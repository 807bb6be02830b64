//! Liveness probe and Prometheus scrape endpoint.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        )
}

pub async fn serve(listener: TcpListener, handle: PrometheusHandle) -> anyhow::Result<()> {
    info!(addr = %listener.local_addr()?, "web endpoint listening");
    axum::serve(listener, router(handle)).await?;
    Ok(())
}
