use std::sync::Arc;
use std::sync::atomic::Ordering;

use tracing::trace;

use super::state::{Flow, Limit};
use crate::metrics::FlowLabels;

impl Flow {
	/// Spawns the periodic reset task. Holds only a `Weak` reference to the
	/// flow, so the ticker winds itself down on its own once the registry
	/// drops the last strong `Arc<Flow>`, rather than requiring an explicit
	/// stop call from every place that could drop the last handle.
	pub(crate) fn spawn_ticker(self: &Arc<Self>) {
		let weak = Arc::downgrade(self);
		let interval = self.interval;
		let handle = tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			// the first `tick()` fires immediately; consume it so the first
			// real reset happens after one full interval has elapsed.
			ticker.tick().await;
			loop {
				ticker.tick().await;
				let Some(flow) = weak.upgrade() else {
					return;
				};
				flow.reset();
			}
		});
		self.ticker.store(Some(Arc::new(handle)));
	}

	/// Advances to the next interval: bumps `version`, snapshots `allowed`
	/// into `prev_allowed`, refills `tokens` capped to `burst`, then wakes
	/// every parked waiter. Each step is individually atomic but not jointly
	/// so with the others.
	pub(crate) fn reset(&self) {
		self.version.fetch_add(1, Ordering::AcqRel);
		let allowed = self.allowed.swap(0, Ordering::AcqRel);
		self.prev_allowed.store(allowed, Ordering::Release);

		let limits = self.limits.load();
		if let (Limit::Fixed(limit), Limit::Fixed(burst)) = (limits.limit, limits.burst) {
			let _ = self
				.tokens
				.fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
					Some(t.saturating_add(limit as i64).min(burst as i64))
				});
		}
		drop(limits);

		if let Some(metrics) = &self.metrics {
			let labels = FlowLabels::new(&self.name);
			metrics.resets.get_or_create(&labels).inc();
			metrics
				.tokens
				.get_or_create(&labels)
				.set(self.tokens.load(Ordering::Acquire));
		}

		trace!(flow = %self.name, allowed, "flow interval reset");
		self.notify.notify_waiters();
	}

	/// Stops the reset ticker immediately, releasing its `JoinHandle`. Any
	/// waiters parked on this flow are woken so they can observe the flow is
	/// gone rather than block forever.
	pub(crate) fn stop_ticker(&self) {
		if let Some(handle) = self.ticker.swap(None) {
			handle.abort();
		}
		self.notify.notify_waiters();
	}
}
