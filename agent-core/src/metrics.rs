//! Small helpers for encoding label values with `prometheus-client`, shared
//! by every metrics-producing module in the workspace.

use std::fmt::{Display, Write};

use prometheus_client::encoding::{EncodeLabelValue, LabelValueEncoder};

/// Wraps a `Display` value so it can be used as a label value.
#[derive(Clone, Hash, Debug, PartialEq, Eq)]
pub struct EncodeDisplay<T>(pub T);

impl<T> From<T> for EncodeDisplay<T> {
	fn from(t: T) -> Self {
		EncodeDisplay(t)
	}
}

impl<T: Display> EncodeLabelValue for EncodeDisplay<T> {
	fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), std::fmt::Error> {
		encoder.write_str(&self.0.to_string())
	}
}

/// Wraps an `Option<T>`, encoding `None` as the literal `"unknown"`.
#[derive(Clone, Hash, Default, Debug, PartialEq, Eq)]
pub struct DefaultedUnknown<T>(pub Option<T>);

impl<T> From<Option<T>> for DefaultedUnknown<T> {
	fn from(t: Option<T>) -> Self {
		DefaultedUnknown(t)
	}
}

impl<T> From<T> for DefaultedUnknown<T> {
	fn from(t: T) -> Self {
		DefaultedUnknown(Some(t))
	}
}

impl<T: EncodeLabelValue> EncodeLabelValue for DefaultedUnknown<T> {
	fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), std::fmt::Error> {
		match &self.0 {
			Some(t) => t.encode(encoder),
			None => encoder.write_str("unknown"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use prometheus_client::encoding::EncodeLabelSet;

	#[derive(Clone, Hash, Default, Debug, PartialEq, Eq, EncodeLabelSet)]
	struct Labels {
		flow: DefaultedUnknown<EncodeDisplay<String>>,
	}

	#[test]
	fn encodes_present_and_missing() {
		let present = Labels {
			flow: DefaultedUnknown(Some(EncodeDisplay("test_flow".to_string()))),
		};
		let missing = Labels::default();
		assert_ne!(present, missing);
	}
}
