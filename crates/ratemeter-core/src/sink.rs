//! Reporting capabilities.
//!
//! - [`MetricSink`]: where counters, gauges and samples end up.
//! - [`SampleConsumer`]: anything that accepts one rate sample per window.
//!   The user-supplied rate observer is one of these; so is the adapter that
//!   forwards samples to a sink.

use std::fmt;
use std::sync::Arc;

use crate::metric::MetricPath;

/// Counter/gauge/sample storage keyed by a name path.
/// Implementations are shared across tasks and must tolerate concurrent calls.
pub trait MetricSink: Send + Sync {
    fn incr_counter(&self, path: &MetricPath, delta: f64);
    fn set_gauge(&self, path: &MetricPath, value: f64);
    fn add_sample(&self, path: &MetricPath, value: f64);
}

impl<T: MetricSink + ?Sized> MetricSink for Arc<T> {
    fn incr_counter(&self, path: &MetricPath, delta: f64) {
        (**self).incr_counter(path, delta)
    }

    fn set_gauge(&self, path: &MetricPath, value: f64) {
        (**self).set_gauge(path, value)
    }

    fn add_sample(&self, path: &MetricPath, value: f64) {
        (**self).add_sample(path, value)
    }
}

/// Consumer of one numeric sample per window.
pub trait SampleConsumer: Send + Sync {
    fn consume(&self, value: u64);
}

/// Optional per-window callback with the latest requests-per-second value.
#[derive(Clone, Default)]
pub enum RateObserver {
    /// Discards every sample.
    #[default]
    Noop,
    /// Hands every sample to the wrapped function.
    Forward(Arc<dyn Fn(u64) + Send + Sync>),
}

impl RateObserver {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        RateObserver::Forward(Arc::new(f))
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, RateObserver::Noop)
    }
}

impl SampleConsumer for RateObserver {
    fn consume(&self, value: u64) {
        match self {
            RateObserver::Noop => {}
            RateObserver::Forward(f) => f(value),
        }
    }
}

impl fmt::Debug for RateObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateObserver::Noop => f.write_str("RateObserver::Noop"),
            RateObserver::Forward(_) => f.write_str("RateObserver::Forward(..)"),
        }
    }
}
