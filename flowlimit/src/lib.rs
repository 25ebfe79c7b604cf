//! A flow rate limiter: a token bucket per named flow, combined with a
//! Random Early Detection (RED) admission policy that biases acceptance
//! toward small requests as the bucket drains.
//!
//! The engine is exposed two ways:
//! - construct a [`Registry`] directly (the usual choice for tests, or a
//!   host that wants several independent tables);
//! - use the process-wide table via [`registry`], for callers that want a
//!   single global namespace of flows addressable from anywhere in the
//!   process.

mod atake;
pub mod config;
pub mod error;
mod flow;
mod metrics;
mod registry;

use once_cell::sync::Lazy;

pub use atake::AtakeHandle;
pub use config::FlowConfig;
pub use error::{Error, Result};
pub use flow::Limit;
pub use registry::{FlowHandle, Registry};

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// The process-wide flow table. Most hosts only need one; tests typically
/// construct their own [`Registry`] instead so flows from different test
/// functions can't collide by name.
pub fn registry() -> &'static Registry {
	&GLOBAL
}
