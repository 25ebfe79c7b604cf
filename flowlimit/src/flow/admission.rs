use std::sync::atomic::Ordering;

use rand::Rng;

use super::state::{Flow, Limit};
use crate::metrics::FlowLabels;

/// Outcome of one probe against the bucket.
enum Probe {
	Admitted,
	Rejected,
}

/// Refunds a speculative deduction unless disarmed.
///
/// Today, `Flow::probe` never suspends between the deduction and the
/// admit/reject decision, so the window this guards against can't actually
/// be hit by task cancellation. It stays as a scoped guard so that window
/// stays closed under future refactors too — a caller cancelled between the
/// deduction and the admit/reject decision must still refund before exit.
struct ProbeGuard<'a> {
	flow: &'a Flow,
	amount: i64,
	armed: bool,
}

impl<'a> ProbeGuard<'a> {
	/// Takes ownership of a deduction that has already been applied with
	/// `fetch_sub(amount)`; refunds it on drop unless `disarm`ed.
	fn already_deducted(flow: &'a Flow, amount: i64) -> Self {
		ProbeGuard {
			flow,
			amount,
			armed: true,
		}
	}

	fn disarm(mut self) {
		self.armed = false;
	}
}

impl Drop for ProbeGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.flow.tokens.fetch_add(self.amount, Ordering::AcqRel);
		}
	}
}

impl Flow {
	/// One probe attempt for `m` tokens (`m = min(remaining, limit)`).
	///
	/// A single atomic fetch-sub produces both `Previous` (the value before
	/// this call) and, by subtraction, `Tokens`
	/// (the value after). Empty-bucket rejection and RED rejection both
	/// refund `m` and report `Probe::Rejected`; admission adds `m` to
	/// `allowed` and reports `Probe::Admitted`.
	fn probe(&self, m: i64) -> Probe {
		let previous = self.tokens.fetch_sub(m, Ordering::AcqRel);
		let guard = ProbeGuard::already_deducted(self, m);
		let tokens = previous - m;

		if tokens <= 0 {
			// guard drops here, refunding `m`.
			return Probe::Rejected;
		}

		// RED: draw uniformly from [1, Previous]. Small `m` against a full
		// bucket (`tokens` close to `previous`) almost always admits; large
		// `m` against a near-empty bucket almost always rejects.
		let r = rand::rng().random_range(1..=previous);
		if r <= tokens {
			guard.disarm();
			Probe::Admitted
		} else {
			Probe::Rejected
		}
	}

	/// Acquires a slot worth `n` tokens, returning once admitted.
	///
	/// `n == 0` admits immediately without touching the bucket.
	/// `limit = Unlimited` short-circuits entirely. For `n` larger than a
	/// single interval's budget, each successful probe deducts at most
	/// `limit` tokens and the remainder is requested again on the next
	/// attempt, accumulating toward `n` across interval boundaries as
	/// needed.
	pub async fn take(&self, n: u64) -> crate::error::Result<()> {
		if n == 0 {
			return Ok(());
		}

		let mut remaining = n;
		let mut observed = self.version_u16();
		loop {
			let limit = match self.limits.load().limit {
				Limit::Unlimited => return Ok(()),
				Limit::Fixed(l) => l,
			};
			let m = remaining.min(limit) as i64;

			match self.probe(m) {
				Probe::Admitted => {
					self.allowed.fetch_add(m as u64, Ordering::AcqRel);
					if let Some(metrics) = &self.metrics {
						metrics
							.admitted_tokens
							.get_or_create(&FlowLabels::new(&self.name))
							.inc_by(m as u64);
					}
					remaining -= m as u64;
					if remaining == 0 {
						return Ok(());
					}
					// more left to admit; retry immediately, the bucket may
					// still have headroom within the same interval.
				},
				Probe::Rejected => {
					if let Some(metrics) = &self.metrics {
						metrics
							.rejected_probes
							.get_or_create(&FlowLabels::new(&self.name))
							.inc();
					}
					observed = self.wait_for_next_interval(observed).await;
				},
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	fn flow(limit: u64) -> std::sync::Arc<Flow> {
		Flow::new(
			agent_core::strng::new("test"),
			Limit::Fixed(limit),
			Duration::from_millis(50),
			None,
		)
	}

	#[test]
	fn probing_zero_tokens_always_admits() {
		// m = 0 means Tokens == Previous, so R <= Tokens holds for every draw.
		let f = flow(100);
		assert!(matches!(f.probe(0), Probe::Admitted));
	}

	#[tokio::test]
	async fn take_zero_leaves_tokens_and_allowed_untouched() {
		let f = flow(100);
		let before = f.tokens.load(Ordering::Acquire);
		f.take(0).await.unwrap();
		assert_eq!(f.tokens.load(Ordering::Acquire), before);
		assert_eq!(f.allowed.load(Ordering::Acquire), 0);
	}

	#[tokio::test]
	async fn unlimited_flow_bypasses_accounting_entirely() {
		let f = Flow::new(
			agent_core::strng::new("unlimited"),
			Limit::Unlimited,
			Duration::from_millis(50),
			None,
		);
		f.take(1_000_000).await.unwrap();
		assert_eq!(f.allowed.load(Ordering::Acquire), 0);
		assert_eq!(f.tokens.load(Ordering::Acquire), 0);
	}

	#[tokio::test]
	async fn take_within_limit_admits_and_records_the_full_amount_as_allowed() {
		// Goes through the `Registry` (rather than a bare `Flow::new`) so a
		// reset ticker is actually running: a RED-rejected probe parks on
		// `wait_for_next_interval`, which only a running ticker can wake.
		let reg = crate::registry::Registry::new();
		let handle = reg.create("t", Limit::Fixed(10), Duration::from_millis(20)).unwrap();
		handle.take(5).await.unwrap();
		assert_eq!(handle.prev_allowed(), 0); // no reset has fired yet
	}

	#[test]
	fn rejected_probe_refunds_exactly_the_attempted_amount() {
		let f = flow(10);
		// drain the bucket to 0 directly so the next probe takes the
		// empty-bucket rejection branch rather than a RED draw.
		f.tokens.store(0, Ordering::Release);
		let before = f.tokens.load(Ordering::Acquire);
		assert!(matches!(f.probe(3), Probe::Rejected));
		assert_eq!(f.tokens.load(Ordering::Acquire), before);
	}
}
