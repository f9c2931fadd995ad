//! Request-rate aggregator.
//!
//! One counter, three long-lived tasks:
//! - counter actor: owns the counter and drains a single inbox of
//!   increment and reset signals in arrival order, so a reset only sees
//!   increments queued before it
//! - clock: fixed-period ticker, queues one reset per window
//! - rate consumer: hands each sample to the sink reporter and the observer
//!
//! Shutdown (explicit, or dropping the aggregator) stops the clock and closes
//! the request side of the inbox. The actor drains what was already accepted
//! and exits, which closes the rate channel and lets the consumer finish.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use ratemeter_core::error::{RateMeterError, Result};
use ratemeter_core::metric::{self, InstanceIdentity, MetricPath};
use ratemeter_core::{MetricSink, RateObserver, SampleConsumer};

const RATE_CHANNEL_CAPACITY: usize = 16;

/// Aggregator tuning. Defaults match a one-second window.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Metric path prefix; `None` or blank resolves to the host name.
    pub identity: Option<String>,
    /// Window length (one reset per window).
    pub window: Duration,
    /// Capacity of the signal inbox.
    pub signal_buffer: usize,
    /// Called once per window with the latest sample.
    pub observer: RateObserver,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            identity: None,
            window: Duration::from_secs(1),
            signal_buffer: 1024,
            observer: RateObserver::Noop,
        }
    }
}

/// Messages accepted by the counter actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Increment,
    Reset,
}

/// Requests seen in the current window. Owned by the counter actor only.
#[derive(Debug, Default)]
struct RequestCounter {
    value: u64,
}

impl RequestCounter {
    fn increment(&mut self) {
        self.value = self.value.saturating_add(1);
    }

    /// Snapshot and zero in one step.
    fn take(&mut self) -> u64 {
        std::mem::take(&mut self.value)
    }
}

/// Forwards rate samples to a sink as a sample plus a "current" gauge.
pub struct SinkRateReporter {
    sink: Arc<dyn MetricSink>,
    sample_path: MetricPath,
    gauge_path: MetricPath,
}

impl SinkRateReporter {
    pub fn new(sink: Arc<dyn MetricSink>, identity: &InstanceIdentity) -> Self {
        Self {
            sink,
            sample_path: MetricPath::new(identity, metric::REQUEST_PER_SECOND),
            gauge_path: MetricPath::new(identity, metric::REQUEST_PER_SECOND_CURRENT),
        }
    }
}

impl SampleConsumer for SinkRateReporter {
    fn consume(&self, value: u64) {
        self.sink.add_sample(&self.sample_path, value as f64);
        self.sink.set_gauge(&self.gauge_path, value as f64);
    }
}

struct Running {
    identity: InstanceIdentity,
    inbox: RwLock<Option<mpsc::Sender<Signal>>>,
    stop_clock: Mutex<Option<oneshot::Sender<()>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Running {
    fn sender(&self) -> Option<mpsc::Sender<Signal>> {
        self.inbox
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Counts requests and turns each window's count into a rate sample.
///
/// Dropping the aggregator stops it the same way [`RateAggregator::shutdown`]
/// does, without waiting for the tasks.
pub struct RateAggregator {
    settings: AggregatorSettings,
    sink: Arc<dyn MetricSink>,
    running: OnceCell<Running>,
}

impl RateAggregator {
    pub fn new(settings: AggregatorSettings, sink: Arc<dyn MetricSink>) -> Self {
        Self {
            settings,
            sink,
            running: OnceCell::new(),
        }
    }

    /// Resolve identity and spawn the background tasks.
    /// Idempotent: concurrent or repeated calls launch exactly one set.
    /// A stopped aggregator is not restarted.
    pub async fn start(&self) -> Result<()> {
        self.running
            .get_or_try_init(|| async { self.launch() })
            .await?;
        Ok(())
    }

    fn launch(&self) -> Result<Running> {
        if self.settings.window.is_zero() {
            return Err(RateMeterError::Config("window must be non-zero".into()));
        }
        if self.settings.signal_buffer == 0 {
            return Err(RateMeterError::Config("signal_buffer must be non-zero".into()));
        }

        let identity = InstanceIdentity::resolve(self.settings.identity.as_deref())?;

        let (inbox_tx, inbox_rx) = mpsc::channel::<Signal>(self.settings.signal_buffer);
        let (rate_tx, rate_rx) = mpsc::channel::<u64>(RATE_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let reporter: Arc<dyn SampleConsumer> =
            Arc::new(SinkRateReporter::new(Arc::clone(&self.sink), &identity));
        let observer: Arc<dyn SampleConsumer> = Arc::new(self.settings.observer.clone());
        let consumers = vec![reporter, observer];

        let tasks = vec![
            tokio::spawn(watch_rate(rate_rx, consumers)),
            tokio::spawn(run_counter(
                inbox_rx,
                Arc::clone(&self.sink),
                MetricPath::new(&identity, metric::TOTAL_REQUESTS),
                rate_tx,
            )),
            tokio::spawn(run_clock(self.settings.window, inbox_tx.clone(), stop_rx)),
        ];

        tracing::info!(
            identity = %identity,
            window_ms = self.settings.window.as_millis() as u64,
            "rate aggregator started"
        );

        Ok(Running {
            identity,
            inbox: RwLock::new(Some(inbox_tx)),
            stop_clock: Mutex::new(Some(stop_tx)),
            tasks: Mutex::new(tasks),
        })
    }

    /// Signal one request. Waits only for the hand-off into the inbox; the
    /// counter update happens on the counter actor, before any reset queued
    /// after this signal.
    /// Signals sent before start or after shutdown are dropped.
    pub async fn record_request(&self) {
        let Some(tx) = self.running.get().and_then(Running::sender) else {
            tracing::debug!("increment signal dropped: aggregator not running");
            return;
        };
        if tx.send(Signal::Increment).await.is_err() {
            tracing::debug!("increment signal dropped: aggregator shut down");
        }
    }

    /// Stop the clock, close the inbox, and wait for every task to exit.
    pub async fn shutdown(&self) {
        let Some(running) = self.running.get() else {
            return;
        };

        let tx = running
            .inbox
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if tx.is_none() {
            return;
        }
        drop(tx);
        if let Some(stop) = lock(&running.stop_clock).take() {
            let _ = stop.send(());
        }

        let tasks = std::mem::take(&mut *lock(&running.tasks));
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "aggregator task ended abnormally");
            }
        }
        tracing::info!(identity = %running.identity, "rate aggregator stopped");
    }

    pub fn is_started(&self) -> bool {
        self.running.initialized()
    }

    pub fn identity(&self) -> Option<&InstanceIdentity> {
        self.running.get().map(|r| &r.identity)
    }
}

async fn run_counter(
    mut inbox: mpsc::Receiver<Signal>,
    sink: Arc<dyn MetricSink>,
    total_path: MetricPath,
    rate_tx: mpsc::Sender<u64>,
) {
    let mut counter = RequestCounter::default();
    while let Some(signal) = inbox.recv().await {
        match signal {
            Signal::Increment => {
                counter.increment();
                sink.incr_counter(&total_path, 1.0);
            }
            Signal::Reset => {
                if rate_tx.send(counter.take()).await.is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("counter actor stopped");
}

async fn run_clock(
    window: Duration,
    inbox: mpsc::Sender<Signal>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut tick = interval_at(Instant::now() + window, window);
    tick.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            biased;
            // also resolves when the aggregator is dropped
            _ = &mut stop_rx => break,
            _ = tick.tick() => {
                if inbox.send(Signal::Reset).await.is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("window clock stopped");
}

async fn watch_rate(mut rate_rx: mpsc::Receiver<u64>, consumers: Vec<Arc<dyn SampleConsumer>>) {
    while let Some(sample) = rate_rx.recv().await {
        tracing::debug!(requests_per_window = sample, "rate sample");
        for c in &consumers {
            c.consume(sample);
        }
    }
    tracing::debug!("rate consumer stopped");
}

// Guarded values stay valid across a panicking holder, so poisoning is ignored.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
