use super::state::Flow;

impl Flow {
	/// Parks until `version` advances past `observed`, then returns the new
	/// version. Built on `tokio::sync::Notify`, signaled once per ticker
	/// firing (`Flow::reset`).
	///
	/// Registers interest in the notification *before* checking the version,
	/// to avoid missing a notification that fires between the check and the
	/// await.
	pub(crate) async fn wait_for_next_interval(&self, observed: u16) -> u16 {
		loop {
			let notified = self.notify.notified();
			let current = self.version_u16();
			if current != observed {
				return current;
			}
			notified.await;
			let current = self.version_u16();
			if current != observed {
				return current;
			}
			// Ticker fired but the flow was destroyed mid-reset, or some
			// other spurious wake; loop and re-register.
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::state::Limit;
	use super::*;

	fn flow(limit: u64) -> std::sync::Arc<Flow> {
		Flow::new(
			agent_core::strng::new("test"),
			Limit::Fixed(limit),
			Duration::from_millis(10),
			None,
		)
	}

	#[tokio::test]
	async fn returns_immediately_if_version_already_advanced() {
		let f = flow(10);
		f.reset(); // version is now 1
		let v = tokio::time::timeout(Duration::from_millis(50), f.wait_for_next_interval(0))
			.await
			.expect("must not block: version already differs from `observed`");
		assert_eq!(v, 1);
	}

	#[tokio::test]
	async fn wakes_once_a_concurrent_reset_advances_the_version() {
		let f = flow(10);
		let waiter = tokio::spawn({
			let f = f.clone();
			async move { f.wait_for_next_interval(0).await }
		});
		// give the waiter a moment to register interest before resetting.
		tokio::task::yield_now().await;
		f.reset();
		let v = tokio::time::timeout(Duration::from_millis(50), waiter)
			.await
			.expect("must wake on reset")
			.unwrap();
		assert_eq!(v, 1);
	}
}
