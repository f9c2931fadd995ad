//! Top-level facade crate for ratemeter.
//!
//! Re-exports the core primitives and the HTTP layer so users can depend on a single crate.

pub mod core {
    pub use ratemeter_core::*;
}

pub mod http {
    pub use ratemeter_http::*;
}

pub use ratemeter_http::{Meter, MetricLayer};
