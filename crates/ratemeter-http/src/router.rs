//! Axum router wiring for the demo server.
//!
//! Every path falls through to a plain-text greeting; the metric layer sits
//! in front and diverts the scrape path.

use axum::Router;

use crate::middleware::MetricLayer;

async fn hello() -> &'static str {
    "Hello world!"
}

pub fn build_router(layer: MetricLayer) -> Router {
    Router::new().fallback(hello).layer(layer)
}
