//! Logging setup shared by anything embedding this workspace.
//!
//! This is a plain `tracing_subscriber::fmt()` + `EnvFilter` + `LOG_FORMAT`
//! setup rather than a dedicated non-blocking/batched writer thread — this
//! library's only logging is flow lifecycle and admission events, well
//! below the volume that would justify one.

use std::env;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Installs a global `tracing` subscriber reading `RUST_LOG` for filtering
/// and `LOG_FORMAT=json` to switch to structured output. Safe to call more
/// than once; only the first call wins.
pub fn init_logging() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let use_json = env::var("LOG_FORMAT").as_deref() == Ok("json");

	let builder = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_span_events(FmtSpan::NONE);

	let result = if use_json {
		builder.json().try_init()
	} else {
		builder.try_init()
	};
	if let Err(e) = result {
		tracing::debug!("logging already initialized: {e}");
	}
}
