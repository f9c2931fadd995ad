//! ratemeter core: runtime-free metric primitives, error types, and the
//! capabilities the aggregator reports through.
//!
//! This crate defines the naming scheme (instance identity + measurement
//! name), the `MetricSink` and `SampleConsumer` seams, and the error surface
//! shared by the HTTP layer. It carries no async runtime so sinks can be
//! implemented and tested without tokio.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths surface as `RateMeterError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metric;
pub mod sink;

/// Shared result type.
pub use error::{ErrorKind, RateMeterError, Result};
pub use metric::{InstanceIdentity, MetricPath};
pub use sink::{MetricSink, RateObserver, SampleConsumer};
