//! Scrape endpoint capability.

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;

/// Handler for the configured scrape path. Receives the request verbatim;
/// its response is returned to the client untouched.
#[async_trait]
pub trait ScrapeHandler: Send + Sync {
    async fn handle(&self, req: Request) -> Response;
}
