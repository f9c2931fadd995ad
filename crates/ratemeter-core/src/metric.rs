//! Metric naming: instance identity + measurement name.
//!
//! Every series the aggregator reports lives under a two-segment path
//! `[identity, measurement]`. The identity is resolved once and never changes
//! for the lifetime of an aggregator.

use std::ffi::OsString;
use std::fmt;
use std::io;

use crate::error::{RateMeterError, Result};

/// Counter: total requests observed (incremented by 1 per request).
pub const TOTAL_REQUESTS: &str = "totalRequests";
/// Sample: requests observed in the last window.
pub const REQUEST_PER_SECOND: &str = "requestPerSecond";
/// Gauge: requests observed in the last window (latest value only).
pub const REQUEST_PER_SECOND_CURRENT: &str = "requestPerSecondCurrent";
/// Gauge: wall-clock time of the last instrumented request.
pub const REQUEST_TIME_NANOSECONDS: &str = "requestTimeNanoseconds";

/// Ordered name path identifying one series in a sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricPath(Vec<String>);

impl MetricPath {
    /// Build `[identity, name]`.
    pub fn new(identity: &InstanceIdentity, name: &str) -> Self {
        Self(vec![identity.as_str().to_string(), name.to_string()])
    }

    /// Build from arbitrary segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for MetricPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Identity of the running process used as the metric path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceIdentity(String);

impl InstanceIdentity {
    /// Resolve identity: non-empty explicit value first, host name otherwise.
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        Self::resolve_with(explicit, hostname::get)
    }

    /// Same as [`InstanceIdentity::resolve`] with an injectable host lookup.
    pub fn resolve_with<F>(explicit: Option<&str>, host: F) -> Result<Self>
    where
        F: FnOnce() -> io::Result<OsString>,
    {
        if let Some(name) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(Self(name.to_string()));
        }

        let raw = host().map_err(|e| {
            RateMeterError::Identity(format!(
                "unable to determine the hostname, please set instance_identity manually: {e}"
            ))
        })?;
        let name = raw.into_string().map_err(|raw| {
            RateMeterError::Identity(format!("hostname is not valid UTF-8: {raw:?}"))
        })?;
        let name = name.trim();
        if name.is_empty() {
            return Err(RateMeterError::Identity(
                "hostname is empty, please set instance_identity manually".into(),
            ));
        }

        tracing::debug!(identity = %name, "instance identity resolved from hostname");
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
