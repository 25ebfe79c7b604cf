use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::registry::{FlowHandle, Registry};

/// Handle to a background task spawned by `atake`.
///
/// `tokio::task::JoinHandle` gives both of the properties a caller needs
/// here directly: dropping (or explicitly `abort`ing) the handle stops the
/// task, and `is_finished` observes its exit without blocking.
pub struct AtakeHandle {
	task: JoinHandle<()>,
}

impl AtakeHandle {
	/// Terminates the background task immediately.
	pub fn abort(&self) {
		self.task.abort();
	}

	/// True once the task has delivered its message and exited (or been
	/// aborted).
	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}
}

impl FlowHandle {
	/// Spawns a task that calls `take(n)` and, on admission, sends `message`
	/// down `deliver`. A thin wrapper — all the admission logic is
	/// `Flow::take` itself.
	pub fn atake<M>(&self, n: u64, message: M, deliver: UnboundedSender<M>) -> AtakeHandle
	where
		M: Send + 'static,
	{
		let flow = self.clone();
		let task = tokio::spawn(async move {
			if flow.take(n).await.is_ok() {
				let _ = deliver.send(message);
			}
		});
		AtakeHandle { task }
	}
}

impl Registry {
	/// As [`FlowHandle::atake`], looked up by flow name.
	pub fn atake<M>(&self, name: &str, n: u64, message: M, deliver: UnboundedSender<M>) -> Result<AtakeHandle>
	where
		M: Send + 'static,
	{
		let flow = self
			.get(name)
			.ok_or_else(|| crate::error::Error::UnknownFlow(agent_core::strng::new(name)))?;
		Ok(flow.atake(n, message, deliver))
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use crate::flow::Limit;

	use super::*;

	#[tokio::test]
	async fn atake_by_name_delivers_the_message_on_admission() {
		let reg = Registry::new();
		reg.create("a", Limit::Fixed(10), Duration::from_millis(20)).unwrap();
		let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
		let handle = reg.atake("a", 1, "done", tx).unwrap();

		let received = tokio::time::timeout(Duration::from_millis(200), rx.recv())
			.await
			.unwrap();
		assert_eq!(received, Some("done"));
		assert!(handle.is_finished());
	}

	#[tokio::test]
	async fn atake_against_an_unknown_flow_is_rejected_up_front() {
		let reg = Registry::new();
		let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
		assert!(reg.atake("ghost", 1, "done", tx).is_err());
	}

	#[tokio::test]
	async fn abort_stops_the_task_without_delivering() {
		let reg = Registry::new();
		let flow = reg.create("a", Limit::Fixed(10), Duration::from_millis(20)).unwrap();
		let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
		let handle = flow.atake(1, "done", tx);
		handle.abort();
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert!(handle.is_finished());
		assert!(rx.try_recv().is_err());
	}
}
