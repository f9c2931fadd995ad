use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use ratemeter_core::error::{RateMeterError, Result};

use crate::middleware::{MetricLayer, MetricLayerBuilder};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateMeterConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl RateMeterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RateMeterError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.metrics.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            RateMeterError::Config(format!("server.listen must be a valid SocketAddr: {e}"))
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Exact request path served by the scrape handler. Empty disables.
    #[serde(default)]
    pub scrape_endpoint_path: String,

    /// Metric path prefix. Omitted means the host name.
    #[serde(default)]
    pub instance_identity: Option<String>,

    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    #[serde(default = "default_signal_buffer")]
    pub signal_buffer: usize,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            scrape_endpoint_path: String::new(),
            instance_identity: None,
            window_ms: default_window_ms(),
            signal_buffer: default_signal_buffer(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !(10..=60_000).contains(&self.window_ms) {
            return Err(RateMeterError::Config(
                "metrics.window_ms must be between 10 and 60000".into(),
            ));
        }
        if self.signal_buffer == 0 {
            return Err(RateMeterError::Config(
                "metrics.signal_buffer must be greater than 0".into(),
            ));
        }
        if !self.scrape_endpoint_path.is_empty() && !self.scrape_endpoint_path.starts_with('/') {
            return Err(RateMeterError::Config(
                "metrics.scrape_endpoint_path must start with '/'".into(),
            ));
        }
        Ok(())
    }

    /// Builder preloaded with this section. Callers add observer/sink.
    pub fn layer_builder(&self) -> MetricLayerBuilder {
        let mut b = MetricLayer::builder()
            .scrape_endpoint_path(self.scrape_endpoint_path.clone())
            .window(Duration::from_millis(self.window_ms))
            .signal_buffer(self.signal_buffer);
        if let Some(id) = &self.instance_identity {
            b = b.instance_identity(id.clone());
        }
        b
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_window_ms() -> u64 {
    1000
}
fn default_signal_buffer() -> usize {
    1024
}
