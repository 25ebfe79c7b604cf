use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use agent_core::Strng;
use arc_swap::{ArcSwap, ArcSwapOption};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::metrics::Metrics;

/// A flow's configured limit, or the unlimited bypass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Limit {
	Fixed(u64),
	Unlimited,
}

impl Limit {
	pub fn as_fixed(self) -> Option<u64> {
		match self {
			Limit::Fixed(v) => Some(v),
			Limit::Unlimited => None,
		}
	}
}

/// `limit`/`burst`/`fair` are each a positive integer or the literal
/// "unlimited". Deserializes from either a YAML/JSON/TOML integer or the
/// string `"unlimited"`.
impl serde::Serialize for Limit {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		match self {
			Limit::Fixed(n) => serializer.serialize_u64(*n),
			Limit::Unlimited => serializer.serialize_str("unlimited"),
		}
	}
}

impl<'de> serde::Deserialize<'de> for Limit {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		#[derive(serde::Deserialize)]
		#[serde(untagged)]
		enum Repr {
			Tokens(u64),
			Word(String),
		}

		match Repr::deserialize(deserializer)? {
			Repr::Tokens(n) if n > 0 => Ok(Limit::Fixed(n)),
			Repr::Tokens(_) => Err(serde::de::Error::custom(
				"limit must be a positive integer or \"unlimited\"",
			)),
			Repr::Word(w) if w.eq_ignore_ascii_case("unlimited") => Ok(Limit::Unlimited),
			Repr::Word(w) => Err(serde::de::Error::custom(format!(
				"invalid limit {w:?}, expected a positive integer or \"unlimited\""
			))),
		}
	}
}

/// `limit`, `burst`, and `fair` as a single immutable value, swapped as a
/// unit so readers of any one field see a configuration that was actually
/// set together by one `set_limit` call.
#[derive(Debug)]
pub struct Limits {
	pub limit: Limit,
	pub burst: Limit,
	pub fair: Limit,
}

impl Limits {
	/// Derives `burst = 5 * limit` and `fair = limit / 5`.
	pub fn derive(limit: Limit) -> Self {
		match limit {
			Limit::Unlimited => Limits {
				limit,
				burst: Limit::Unlimited,
				fair: Limit::Unlimited,
			},
			Limit::Fixed(l) => Limits {
				limit,
				burst: Limit::Fixed(l.saturating_mul(5)),
				fair: Limit::Fixed(l / 5),
			},
		}
	}
}

/// The shared, mutable accounting record of one named flow.
///
/// Every counter here is an independent atomic; there is no flow-wide lock.
/// No operation spans more than one of these atomics jointly, beyond each
/// individual compound read-modify-write.
pub struct Flow {
	pub(crate) name: Strng,
	pub(crate) interval: Duration,
	pub(crate) limits: ArcSwap<Limits>,
	/// Bucket level. May be observed `<= 0` only transiently, inside a
	/// rejected probe, between the speculative deduction and its refund.
	pub(crate) tokens: AtomicI64,
	pub(crate) allowed: AtomicU64,
	pub(crate) prev_allowed: AtomicU64,
	/// Rolling interval counter, read modulo `0x10000`. Compared only for
	/// inequality, never for magnitude.
	pub(crate) version: AtomicU32,
	pub(crate) notify: Notify,
	pub(crate) ticker: ArcSwapOption<JoinHandle<()>>,
	pub(crate) metrics: Option<Arc<Metrics>>,
}

impl Flow {
	pub(crate) fn new(
		name: Strng,
		limit: Limit,
		interval: Duration,
		metrics: Option<Arc<Metrics>>,
	) -> Arc<Self> {
		let limits = Limits::derive(limit);
		let initial_tokens = limits.burst.as_fixed().map(|b| b as i64).unwrap_or(0);
		Arc::new(Flow {
			name,
			interval,
			limits: ArcSwap::from_pointee(limits),
			tokens: AtomicI64::new(initial_tokens),
			allowed: AtomicU64::new(0),
			prev_allowed: AtomicU64::new(0),
			version: AtomicU32::new(0),
			notify: Notify::new(),
			ticker: ArcSwapOption::empty(),
			metrics,
		})
	}

	pub fn name(&self) -> &Strng {
		&self.name
	}

	pub fn get_limit(&self) -> Limit {
		self.limits.load().limit
	}

	pub fn set_limit(&self, limit: Limit) {
		let limits = Limits::derive(limit);
		let new_tokens = limits.burst.as_fixed().map(|b| b as i64);
		self.limits.store(Arc::new(limits));
		// tokens is an independent atomic, so this store is not joint with
		// the swap above. A concurrent `take` may see the new limit with
		// the old token count for at most one interval.
		if let Some(tokens) = new_tokens {
			self.tokens.store(tokens, Ordering::Release);
		}
	}

	pub fn prev_allowed(&self) -> u64 {
		self.prev_allowed.load(Ordering::Acquire)
	}

	/// Current interval version, masked to a `u16` range.
	pub(crate) fn version_u16(&self) -> u16 {
		(self.version.load(Ordering::Acquire) & 0xFFFF) as u16
	}
}
