//! ratemeter HTTP library entry.
//!
//! This crate wires the rate aggregator, the tower instrumentation layer, the
//! bundled Prometheus sink, and config loading into one stack. It is consumed
//! by the demo binary (`main.rs`) and by integration tests.

pub mod aggregator;
pub mod config;
pub mod middleware;
pub mod obs;
pub mod router;
pub mod scrape;

pub use aggregator::{AggregatorSettings, RateAggregator, SinkRateReporter};
pub use middleware::{Meter, MetricLayer, MetricLayerBuilder, MetricService};
pub use scrape::ScrapeHandler;
