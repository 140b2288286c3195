use axum::{routing::get, Router};
use axum_health::Health;
use axum_prometheus::PrometheusMetricLayer;
use keybridge_core::Config;

/// Operational endpoints, nested under `/.meta` away from the OAuth
/// surface.
pub fn router(config: &Config) -> Router<Config> {
    let mut router = Router::new();
    if config.application.health_check {
        router = router.merge(health());
    }
    if config.application.prometheus {
        tracing::info!("Prometheus metrics enabled");
        router = router.merge(metrics());
    }
    router
}

fn health() -> Router<Config> {
    Router::new()
        .route("/health", get(axum_health::health))
        .layer(Health::builder().build())
}

fn metrics() -> Router<Config> {
    let (layer, handle) = PrometheusMetricLayer::pair();
    Router::new()
        .route("/metrics", get(move || async move { handle.render() }))
        .layer(layer)
}
