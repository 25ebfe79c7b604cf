use std::sync::Arc;
use std::time::Duration;

use agent_core::Strng;
use agent_core::strng;

use crate::error::{Error, Result};
use crate::flow::{Flow, Limit};
use crate::metrics::Metrics;

/// A cheap-to-clone handle to one flow's `Arc<Flow>`, exposing the full set
/// of operations a caller can perform against a flow by name.
#[derive(Clone)]
pub struct FlowHandle(pub(crate) Arc<Flow>);

impl FlowHandle {
	pub fn name(&self) -> &Strng {
		self.0.name()
	}

	/// Acquires a slot worth `n` tokens, blocking until admitted.
	pub async fn take(&self, n: u64) -> Result<()> {
		self.0.take(n).await
	}

	pub fn get_limit(&self) -> Limit {
		self.0.get_limit()
	}

	pub fn set_limit(&self, limit: Limit) {
		self.0.set_limit(limit)
	}

	pub fn prev_allowed(&self) -> u64 {
		self.0.prev_allowed()
	}

	/// No-op, reserved for future per-member accounting.
	pub fn join(&self) -> Result<()> {
		Ok(())
	}
}

/// A process-wide (or test-scoped) table of named flows, one token bucket +
/// RED engine per entry. Backed by `flurry::HashMap`, a lock-free concurrent
/// map, since flow lookup happens on every `take` call from arbitrarily many
/// concurrent tasks.
pub struct Registry {
	flows: flurry::HashMap<Strng, Arc<Flow>>,
	metrics: Option<Arc<Metrics>>,
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}

impl Registry {
	pub fn new() -> Self {
		Registry {
			flows: flurry::HashMap::new(),
			metrics: None,
		}
	}

	/// As [`Registry::new`], but registers a [`Metrics`] family into
	/// `registry` and attaches it to every flow this table creates.
	pub fn with_metrics(registry: &mut prometheus_client::registry::Registry) -> Self {
		Registry {
			flows: flurry::HashMap::new(),
			metrics: Some(Arc::new(Metrics::new(registry))),
		}
	}

	/// Creates a new flow, installing its reset ticker. Fails if `name` is
	/// already registered.
	pub fn create(&self, name: impl Into<Strng>, limit: Limit, interval: Duration) -> Result<FlowHandle> {
		let name = name.into();
		validate(limit, interval)?;

		let flow = Flow::new(name.clone(), limit, interval, self.metrics.clone());
		let guard = self.flows.guard();
		match self.flows.try_insert(name.clone(), flow.clone(), &guard) {
			Ok(_) => {
				flow.spawn_ticker();
				Ok(FlowHandle(flow))
			},
			Err(_) => Err(Error::FlowAlreadyExists(name)),
		}
	}

	/// Looks up an existing flow handle by name.
	pub fn get(&self, name: &str) -> Option<FlowHandle> {
		let guard = self.flows.guard();
		self.flows.get(name, &guard).cloned().map(FlowHandle)
	}

	fn require(&self, name: &str) -> Result<FlowHandle> {
		self.get(name).ok_or_else(|| Error::UnknownFlow(strng::new(name)))
	}

	pub fn get_limit(&self, name: &str) -> Result<Limit> {
		Ok(self.require(name)?.get_limit())
	}

	pub fn set_limit(&self, name: &str, limit: Limit) -> Result<()> {
		self.require(name)?.set_limit(limit);
		Ok(())
	}

	pub fn prev_allowed(&self, name: &str) -> Result<u64> {
		Ok(self.require(name)?.prev_allowed())
	}

	pub async fn take(&self, name: &str, n: u64) -> Result<()> {
		self.require(name)?.take(n).await
	}

	/// No-op, reserved for future per-member accounting.
	pub fn join(&self, name: &str) -> Result<()> {
		self.require(name)?.join()
	}

	/// Removes a flow, stopping its reset ticker and releasing its
	/// `JoinHandle`. Needed by any host that wants to tear down flows before
	/// process exit.
	pub fn remove(&self, name: &str) -> bool {
		let guard = self.flows.guard();
		match self.flows.remove(name, &guard) {
			Some(flow) => {
				flow.stop_ticker();
				true
			},
			None => false,
		}
	}
}

fn validate(limit: Limit, interval: Duration) -> Result<()> {
	if let Limit::Fixed(0) = limit {
		return Err(Error::InvalidArgument("limit must be positive or unlimited"));
	}
	if interval.is_zero() {
		return Err(Error::InvalidArgument("interval must be positive"));
	}
	Ok(())
}
