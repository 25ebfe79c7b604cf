//! Per-flow observability. Registered into a caller-supplied
//! `prometheus_client::registry::Registry`: a `Family` keyed on a small
//! label set, built once and cloned cheaply into whoever needs to record
//! against it.

use agent_core::Strng;
use agent_core::metrics::EncodeDisplay;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

#[derive(Clone, Hash, Debug, PartialEq, Eq, EncodeLabelSet)]
pub struct FlowLabels {
	pub flow: EncodeDisplay<Strng>,
}

impl FlowLabels {
	pub fn new(flow: &Strng) -> Self {
		Self {
			flow: EncodeDisplay(flow.clone()),
		}
	}
}

type FlowCounter = Family<FlowLabels, Counter>;
type FlowGauge = Family<FlowLabels, Gauge>;

/// Shared metrics for every flow in a registry. Cheap to clone (it is a
/// handful of `Family` handles, themselves `Arc`-backed).
#[derive(Clone, Debug)]
pub struct Metrics {
	/// Tokens admitted, labeled by flow. Summed over an interval this
	/// equals `prev_allowed` for that interval.
	pub admitted_tokens: FlowCounter,
	/// Probes rejected (empty-bucket or RED), labeled by flow.
	pub rejected_probes: FlowCounter,
	/// Current bucket level, labeled by flow. Best-effort snapshot; like
	/// `tokens` itself this can be transiently negative.
	pub tokens: FlowGauge,
	/// Reset ticker firings, labeled by flow.
	pub resets: FlowCounter,
}

impl Metrics {
	pub fn new(registry: &mut Registry) -> Self {
		let mut build = |name: &str, help: &str| -> FlowCounter {
			let m = Family::default();
			registry.register(name, help, m.clone());
			m
		};
		let mut build_gauge = |name: &str, help: &str| -> FlowGauge {
			let m = Family::default();
			registry.register(name, help, m.clone());
			m
		};
		Metrics {
			admitted_tokens: build("flow_admitted_tokens", "Tokens admitted by take()"),
			rejected_probes: build("flow_rejected_probes", "Probes rejected by take()"),
			tokens: build_gauge("flow_tokens", "Current token bucket level"),
			resets: build("flow_resets", "Reset ticker firings"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_registers_all_four_families_and_they_are_independently_usable() {
		let mut registry = Registry::default();
		let metrics = Metrics::new(&mut registry);
		let labels = FlowLabels::new(&agent_core::strng::new("ingress"));

		metrics.admitted_tokens.get_or_create(&labels).inc_by(5);
		metrics.rejected_probes.get_or_create(&labels).inc();
		metrics.tokens.get_or_create(&labels).set(100);
		metrics.resets.get_or_create(&labels).inc();

		let mut buf = String::new();
		prometheus_client::encoding::text::encode(&mut buf, &registry).unwrap();
		assert!(buf.contains("flow_admitted_tokens"));
		assert!(buf.contains("flow_rejected_probes"));
		assert!(buf.contains("flow_tokens"));
		assert!(buf.contains("flow_resets"));
	}

	#[test]
	fn labels_with_the_same_flow_name_are_equal() {
		let a = FlowLabels::new(&agent_core::strng::new("x"));
		let b = FlowLabels::new(&agent_core::strng::new("x"));
		assert_eq!(a, b);
	}
}
