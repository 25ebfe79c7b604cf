use agent_core::Strng;

/// Errors surfaced by the flow registry and its operations.
///
/// Admission pressure (an empty bucket, a RED-rejected probe) is never an
/// error: it is internal retry state that `take` resolves on its own by
/// waiting for the next interval. Only programming errors — an unknown
/// flow, a duplicate name, a bad argument — reach the caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
	#[error("no flow named {0:?}")]
	UnknownFlow(Strng),

	#[error("a flow named {0:?} already exists")]
	FlowAlreadyExists(Strng),

	#[error("invalid argument: {0}")]
	InvalidArgument(&'static str),

	#[error("failed to schedule the reset ticker for flow {0:?}")]
	TickerSchedulingFailed(Strng),
}

pub type Result<T> = std::result::Result<T, Error>;
