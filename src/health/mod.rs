//! Liveness and metrics responder for the hosting platform.


use tokio::sync::watch;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

use crate::metrics::metrics_text;

pub fn routes() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path!("health").and(warp::get()).map(|| "OK");
    let metrics = warp::path!("metrics")
        .and(warp::get())
        .and_then(metrics_handler);

    health.or(metrics)
}

/// Serves [`routes`] on `0.0.0.0:port` until `shutdown_signal` fires.
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    let (addr, server) =
        warp::serve(routes()).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    info!("Health endpoint listening on {}", addr);
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(metrics_text())
}
