//! Shared test helpers.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use ratemeter_core::{MetricPath, MetricSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Counter,
    Gauge,
    Sample,
}

/// Sink that keeps every call in arrival order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(Kind, String, f64)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, kind: Kind, path: &MetricPath, value: f64) {
        self.events
            .lock()
            .unwrap()
            .push((kind, path.to_string(), value));
    }

    pub fn values(&self, kind: Kind, path: &str) -> Vec<f64> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, p, _)| *k == kind && p == path)
            .map(|(_, _, v)| *v)
            .collect()
    }

    pub fn counter_total(&self, path: &str) -> f64 {
        self.values(Kind::Counter, path).iter().sum()
    }

    pub fn samples(&self, path: &str) -> Vec<f64> {
        self.values(Kind::Sample, path)
    }

    pub fn last_gauge(&self, path: &str) -> Option<f64> {
        self.values(Kind::Gauge, path).last().copied()
    }
}

impl MetricSink for RecordingSink {
    fn incr_counter(&self, path: &MetricPath, delta: f64) {
        self.push(Kind::Counter, path, delta);
    }

    fn set_gauge(&self, path: &MetricPath, value: f64) {
        self.push(Kind::Gauge, path, value);
    }

    fn add_sample(&self, path: &MetricPath, value: f64) {
        self.push(Kind::Sample, path, value);
    }
}

/// Observer target collecting every rate value.
pub fn collector() -> (Arc<Mutex<Vec<u64>>>, impl Fn(u64) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let out = Arc::clone(&seen);
    (seen, move |v| out.lock().unwrap().push(v))
}
