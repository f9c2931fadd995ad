//! Bundled metrics backend.
//!
//! A DashMap registry implementing `MetricSink`, plus a scrape handler that
//! renders it in Prometheus text format.

pub mod prometheus;

pub use prometheus::{PrometheusExporter, PrometheusSink};
