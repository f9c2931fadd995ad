//! In-process metrics sink with Prometheus text rendering.
//!
//! Series are keyed by the metric path flattened with `_` (so
//! `["web-1", "totalRequests"]` becomes `web_1_totalRequests`). Samples are
//! kept as a count/sum summary with no quantiles. Storage is `DashMap`, so
//! concurrent reporting only contends per shard.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use ratemeter_core::{MetricPath, MetricSink};

use crate::scrape::ScrapeHandler;

const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Flatten a path into a valid Prometheus metric name.
pub fn flatten_name(path: &MetricPath) -> String {
    let joined = path.segments().join("_");
    let mut name: String = joined
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect();
    if name.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

#[derive(Debug, Default, Clone, Copy)]
struct Summary {
    count: u64,
    sum: f64,
}

#[derive(Default)]
pub struct PrometheusSink {
    counters: DashMap<String, f64>,
    gauges: DashMap<String, f64>,
    samples: DashMap<String, Summary>,
}

impl PrometheusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, path: &MetricPath) -> Option<f64> {
        self.counters.get(&flatten_name(path)).map(|v| *v)
    }

    pub fn gauge(&self, path: &MetricPath) -> Option<f64> {
        self.gauges.get(&flatten_name(path)).map(|v| *v)
    }

    /// `(count, sum)` of a sample series.
    pub fn sample(&self, path: &MetricPath) -> Option<(u64, f64)> {
        self.samples
            .get(&flatten_name(path))
            .map(|s| (s.count, s.sum))
    }

    /// Render every series in Prometheus text exposition format, sorted by name.
    pub fn render(&self) -> String {
        let mut out = String::new();

        for (name, v) in sorted(&self.counters) {
            let _ = writeln!(out, "# TYPE {name} counter\n{name} {v}");
        }
        for (name, v) in sorted(&self.gauges) {
            let _ = writeln!(out, "# TYPE {name} gauge\n{name} {v}");
        }
        for (name, s) in sorted(&self.samples) {
            let _ = writeln!(
                out,
                "# TYPE {name} summary\n{name}_sum {}\n{name}_count {}",
                s.sum, s.count
            );
        }
        out
    }
}

fn sorted<V: Copy>(map: &DashMap<String, V>) -> Vec<(String, V)> {
    let mut rows: Vec<(String, V)> = map.iter().map(|r| (r.key().clone(), *r.value())).collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}

impl MetricSink for PrometheusSink {
    fn incr_counter(&self, path: &MetricPath, delta: f64) {
        *self.counters.entry(flatten_name(path)).or_insert(0.0) += delta;
    }

    fn set_gauge(&self, path: &MetricPath, value: f64) {
        self.gauges.insert(flatten_name(path), value);
    }

    fn add_sample(&self, path: &MetricPath, value: f64) {
        let mut s = self.samples.entry(flatten_name(path)).or_default();
        s.count += 1;
        s.sum += value;
    }
}

/// Scrape endpoint serving a [`PrometheusSink`].
#[derive(Clone)]
pub struct PrometheusExporter {
    sink: Arc<PrometheusSink>,
}

impl PrometheusExporter {
    pub fn new(sink: Arc<PrometheusSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl ScrapeHandler for PrometheusExporter {
    async fn handle(&self, _req: Request) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            self.sink.render(),
        )
            .into_response()
    }
}
