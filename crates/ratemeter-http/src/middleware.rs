//! Request instrumentation as a tower middleware.
//!
//! `MetricLayer` wraps any axum-compatible service. Per request:
//! 1. start the aggregator if needed (fatal on failure)
//! 2. scrape path? hand the request to the scrape handler, nothing counted
//! 3. otherwise signal one request, call the inner service, and report the
//!    elapsed nanoseconds as a gauge, whatever the inner result was, also
//!    when the request future is dropped early
//!
//! The inner service's response and error pass through unmodified.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;
use tokio::time::Instant;
use tower::{Layer, Service};

use ratemeter_core::error::{RateMeterError, Result};
use ratemeter_core::metric::{self, MetricPath};
use ratemeter_core::{MetricSink, RateObserver};

use crate::aggregator::{AggregatorSettings, RateAggregator};
use crate::obs::{PrometheusExporter, PrometheusSink};
use crate::scrape::ScrapeHandler;

/// Shared instrumentation state behind every clone of the layer/service.
pub struct Meter {
    aggregator: RateAggregator,
    sink: Arc<dyn MetricSink>,
    scrape_path: Option<String>,
    scrape: Option<Arc<dyn ScrapeHandler>>,
}

impl Meter {
    /// Start the aggregator explicitly. Idempotent.
    pub async fn start(&self) -> Result<()> {
        self.aggregator.start().await
    }

    /// Lazy start used on the request path. Instrumentation is mandatory,
    /// so a failure here terminates the process.
    async fn ensure_started(&self) {
        if self.aggregator.is_started() {
            return;
        }
        if let Err(e) = self.aggregator.start().await {
            tracing::error!(error = %e, kind = e.kind().as_str(), "metrics initialization failed");
            std::process::exit(1);
        }
    }

    /// Exact path match against a non-empty scrape path.
    pub fn is_scrape(&self, path: &str) -> bool {
        self.scrape_path.as_deref().is_some_and(|p| p == path)
    }

    pub async fn record_request(&self) {
        self.aggregator.record_request().await;
    }

    pub fn record_latency(&self, elapsed: Duration) {
        let Some(identity) = self.aggregator.identity() else {
            return;
        };
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.sink.set_gauge(
            &MetricPath::new(identity, metric::REQUEST_TIME_NANOSECONDS),
            nanos as f64,
        );
    }

    /// Stop the aggregator tasks. Requests after this are no longer counted.
    pub async fn shutdown(&self) {
        self.aggregator.shutdown().await;
    }

    pub fn aggregator(&self) -> &RateAggregator {
        &self.aggregator
    }

    pub fn scrape_path(&self) -> Option<&str> {
        self.scrape_path.as_deref()
    }
}

/// Builder for [`MetricLayer`].
#[derive(Default)]
pub struct MetricLayerBuilder {
    scrape_path: String,
    settings: AggregatorSettings,
    sink: Option<Arc<dyn MetricSink>>,
    scrape: Option<Arc<dyn ScrapeHandler>>,
}

impl MetricLayerBuilder {
    /// Exact request path routed to the scrape handler. Empty disables.
    pub fn scrape_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.scrape_path = path.into();
        self
    }

    pub fn instance_identity(mut self, identity: impl Into<String>) -> Self {
        self.settings.identity = Some(identity.into());
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.settings.window = window;
        self
    }

    pub fn signal_buffer(mut self, capacity: usize) -> Self {
        self.settings.signal_buffer = capacity;
        self
    }

    pub fn rate_observer<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.settings.observer = RateObserver::from_fn(f);
        self
    }

    pub fn observer(mut self, observer: RateObserver) -> Self {
        self.settings.observer = observer;
        self
    }

    /// Custom sink. A scrape path then needs an explicit scrape handler.
    pub fn sink(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Only valid together with [`MetricLayerBuilder::sink`].
    pub fn scrape_handler(mut self, handler: Arc<dyn ScrapeHandler>) -> Self {
        self.scrape = Some(handler);
        self
    }

    /// Report into `sink` and serve it on the scrape path.
    pub fn prometheus_sink(mut self, sink: Arc<PrometheusSink>) -> Self {
        self.scrape = Some(Arc::new(PrometheusExporter::new(Arc::clone(&sink))));
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<MetricLayer> {
        let scrape_path = Some(self.scrape_path).filter(|p| !p.is_empty());

        let (sink, scrape) = match (self.sink, self.scrape) {
            (Some(sink), scrape) => (sink, scrape),
            // the handler could never read what the default sink records
            (None, Some(_)) => {
                return Err(RateMeterError::SinkInit(
                    "custom scrape handler needs a readable sink (sink or prometheus_sink)".into(),
                ));
            }
            (None, None) => {
                let prom = Arc::new(PrometheusSink::new());
                let exporter: Arc<dyn ScrapeHandler> =
                    Arc::new(PrometheusExporter::new(Arc::clone(&prom)));
                let sink: Arc<dyn MetricSink> = prom;
                (sink, Some(exporter))
            }
        };

        if scrape_path.is_some() && scrape.is_none() {
            return Err(RateMeterError::SinkInit(
                "scrape_endpoint_path is set but no scrape handler was given for the custom sink"
                    .into(),
            ));
        }

        let meter = Meter {
            aggregator: RateAggregator::new(self.settings, Arc::clone(&sink)),
            sink,
            scrape_path,
            scrape,
        };
        Ok(MetricLayer {
            meter: Arc::new(meter),
        })
    }
}

/// Tower layer adding request-rate and latency instrumentation.
#[derive(Clone)]
pub struct MetricLayer {
    meter: Arc<Meter>,
}

impl MetricLayer {
    pub fn builder() -> MetricLayerBuilder {
        MetricLayerBuilder::default()
    }

    pub fn meter(&self) -> Arc<Meter> {
        Arc::clone(&self.meter)
    }
}

impl<S> Layer<S> for MetricLayer {
    type Service = MetricService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricService {
            inner,
            meter: Arc::clone(&self.meter),
        }
    }
}

/// Service produced by [`MetricLayer`].
#[derive(Clone)]
pub struct MetricService<S> {
    inner: S,
    meter: Arc<Meter>,
}

impl<S> Service<Request> for MetricService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, std::result::Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // the readied service goes into the future, a fresh clone stays behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let meter = Arc::clone(&self.meter);

        Box::pin(async move {
            meter.ensure_started().await;

            if meter.is_scrape(req.uri().path()) {
                if let Some(scrape) = meter.scrape.as_ref() {
                    return Ok(scrape.handle(req).await);
                }
            }

            let _latency = LatencyGuard::new(Arc::clone(&meter));
            meter.record_request().await;
            inner.call(req).await
        })
    }
}

/// Reports elapsed time on drop, so a cancelled or panicking request is
/// still measured.
struct LatencyGuard {
    meter: Arc<Meter>,
    start: Instant,
}

impl LatencyGuard {
    fn new(meter: Arc<Meter>) -> Self {
        Self {
            meter,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyGuard {
    fn drop(&mut self) {
        self.meter.record_latency(self.start.elapsed());
    }
}
