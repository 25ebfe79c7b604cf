//! Declarative flow definitions, for a host that loads its flow topology
//! from a config file at boot instead of calling [`Registry::create`]
//! directly for each one.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::flow::Limit;
use crate::registry::{FlowHandle, Registry};

fn default_interval() -> Duration {
	Duration::from_secs(1)
}

/// Serializes/deserializes a [`Duration`] as a human-readable string
/// (`"1s"`, `"500ms"`) for use with `#[serde(with = "serde_dur")]`.
mod serde_dur {
	use std::time::Duration;

	use duration_str::HumanFormat;
	pub use duration_str::deserialize_duration as deserialize;
	use serde::Serializer;

	pub fn serialize<S: Serializer>(t: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&t.human_format())
	}
}

/// One flow as declared in host configuration.
///
/// ```yaml
/// name: ingress
/// limit: 512
/// interval: 1s
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FlowConfig {
	pub name: String,
	pub limit: Limit,
	#[serde(default = "default_interval", with = "serde_dur")]
	pub interval: Duration,
}

impl Registry {
	/// As [`Registry::create`], taking a declarative [`FlowConfig`] — the
	/// shape a host would deserialize a batch of from YAML/JSON at startup.
	pub fn create_from_config(&self, config: FlowConfig) -> Result<FlowHandle> {
		self.create(config.name, config.limit, config.interval)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deserializes_fixed_limit_and_human_interval() {
		let cfg: FlowConfig = serde_json::from_str(
			r#"{"name": "ingress", "limit": 512, "interval": "2s"}"#,
		)
		.unwrap();
		assert_eq!(cfg.name, "ingress");
		assert_eq!(cfg.limit, Limit::Fixed(512));
		assert_eq!(cfg.interval, Duration::from_secs(2));
	}

	#[test]
	fn deserializes_unlimited_limit() {
		let cfg: FlowConfig =
			serde_json::from_str(r#"{"name": "control", "limit": "unlimited"}"#).unwrap();
		assert_eq!(cfg.limit, Limit::Unlimited);
		assert_eq!(cfg.interval, Duration::from_secs(1));
	}

	#[test]
	fn rejects_zero_limit() {
		let err = serde_json::from_str::<FlowConfig>(r#"{"name": "x", "limit": 0}"#).unwrap_err();
		assert!(err.to_string().contains("positive"));
	}

	#[test]
	fn rejects_unknown_fields() {
		let err =
			serde_json::from_str::<FlowConfig>(r#"{"name": "x", "limit": 1, "bogus": true}"#)
				.unwrap_err();
		assert!(err.to_string().contains("bogus"));
	}
}
