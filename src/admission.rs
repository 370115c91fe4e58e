//! Fixed-window admission limiting keyed by client identity and route.
//!
//! Each `(client, route)` key owns one window entry. The first request after a window ends
//! opens a fresh window; within a window at most [`AdmissionPolicy::max_requests`] requests are
//! admitted. Bursts of up to twice the nominal rate can pass across a window boundary.
//! Entries are never evicted, so the table grows with the number of distinct keys seen;
//! [`AdmissionLimiter::tracked_keys`] exposes its size.

pub mod client;

pub use client::*;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{_prelude::*, error::ConfigError, obs};

const MAX_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

/// Limit applied to every key of one limiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionPolicy {
	/// Requests admitted per window. Zero rejects everything.
	pub max_requests: u32,
	/// Window length in seconds.
	pub window_secs: i64,
}
impl AdmissionPolicy {
	/// Registration limit: 5 requests per minute.
	pub const REGISTER: Self = Self { max_requests: 5, window_secs: 60 };
	/// Login limit: 10 requests per minute.
	pub const LOGIN: Self = Self { max_requests: 10, window_secs: 60 };

	/// Creates a policy admitting `max_requests` per `window`.
	pub fn new(max_requests: u32, window: Duration) -> Self {
		Self { max_requests, window_secs: window.whole_seconds() }
	}

	/// Window length.
	pub fn window(&self) -> Duration {
		Duration::seconds(self.window_secs)
	}

	/// Checks the window is positive and at most one year long.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !(1..=MAX_WINDOW_SECS).contains(&self.window_secs) {
			return Err(ConfigError::InvalidAdmissionWindow {
				window_secs: self.window_secs,
				max_secs: MAX_WINDOW_SECS,
			});
		}

		Ok(())
	}
}

/// Key a window entry is tracked under.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdmissionKey {
	/// Resolved client identity, usually an IP address.
	pub client: String,
	/// Logical route or endpoint being limited.
	pub route: String,
}
impl AdmissionKey {
	/// Creates a key for an already-resolved client identity.
	pub fn new(client: impl Into<String>, route: impl Into<String>) -> Self {
		Self { client: client.into(), route: route.into() }
	}

	/// Creates a key by resolving the client identity from request metadata.
	///
	/// See [`resolve_client_identity`] for the resolution order.
	pub fn from_request(
		forwarded_for: Option<&str>,
		real_ip: Option<&str>,
		peer_addr: &str,
		route: impl Into<String>,
	) -> Self {
		Self::new(resolve_client_identity(forwarded_for, real_ip, peer_addr), route)
	}
}
impl Display for AdmissionKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}|{}", self.client, self.route)
	}
}

/// Outcome of an admission check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdmissionDecision {
	/// The request may proceed.
	Admit,
	/// The request must be refused.
	Reject(RetryDirective),
}
impl AdmissionDecision {
	/// Returns `true` for [`AdmissionDecision::Admit`].
	pub fn is_admitted(&self) -> bool {
		matches!(self, Self::Admit)
	}
}

/// Advises callers when a rejected key can be admitted again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// First instant at which the key's window will have reset.
	pub earliest_retry_at: OffsetDateTime,
	/// Time left until `earliest_retry_at`, measured from the check.
	pub recommended_backoff: Duration,
}

#[derive(Clone, Copy, Debug)]
struct WindowEntry {
	count: u32,
	window_end: OffsetDateTime,
}

/// Fixed-window rate limiter shared by all concurrent requests of one route family.
///
/// All reads and writes of the window table happen under one mutex, so concurrent checks on
/// the same key never lose increments or tear a reset.
#[derive(Debug)]
pub struct AdmissionLimiter {
	policy: AdmissionPolicy,
	windows: Mutex<HashMap<AdmissionKey, WindowEntry>>,
	admitted: AtomicU64,
	rejected: AtomicU64,
}
impl AdmissionLimiter {
	/// Creates a limiter enforcing `policy` on every key; rejects an invalid policy at startup.
	pub fn new(policy: AdmissionPolicy) -> Result<Self, ConfigError> {
		policy.validate()?;

		Ok(Self {
			policy,
			windows: Default::default(),
			admitted: AtomicU64::new(0),
			rejected: AtomicU64::new(0),
		})
	}

	/// Policy enforced by this limiter.
	pub fn policy(&self) -> AdmissionPolicy {
		self.policy
	}

	/// Returns `true` if a request for `key` is admitted now.
	pub fn admit(&self, key: &AdmissionKey) -> bool {
		self.check(key).is_admitted()
	}

	/// Admits `key` now or fails with [`Error::RateLimited`].
	pub fn enforce(&self, key: &AdmissionKey) -> Result<()> {
		match self.check(key) {
			AdmissionDecision::Admit => Ok(()),
			AdmissionDecision::Reject(_) => Err(Error::RateLimited),
		}
	}

	/// Checks `key` against the current clock.
	pub fn check(&self, key: &AdmissionKey) -> AdmissionDecision {
		self.check_at(key, OffsetDateTime::now_utc())
	}

	/// Checks `key` as if the current instant were `now`.
	///
	/// A window is still open while `now <= window_end`.
	pub fn check_at(&self, key: &AdmissionKey, now: OffsetDateTime) -> AdmissionDecision {
		let decision = {
			let mut windows = self.windows.lock();

			match windows.get_mut(key) {
				Some(entry) if now <= entry.window_end =>
					if entry.count < self.policy.max_requests {
						entry.count += 1;

						AdmissionDecision::Admit
					} else {
						AdmissionDecision::Reject(RetryDirective {
							earliest_retry_at: entry.window_end,
							recommended_backoff: entry.window_end - now,
						})
					},
				_ => self.open_window(&mut windows, key, now),
			}
		};

		self.observe(key, &decision);

		decision
	}

	/// Number of keys currently holding a window entry.
	pub fn tracked_keys(&self) -> usize {
		self.windows.lock().len()
	}

	/// Total requests admitted.
	pub fn admitted(&self) -> u64 {
		self.admitted.load(Ordering::Relaxed)
	}

	/// Total requests rejected.
	pub fn rejected(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	fn open_window(
		&self,
		windows: &mut HashMap<AdmissionKey, WindowEntry>,
		key: &AdmissionKey,
		now: OffsetDateTime,
	) -> AdmissionDecision {
		let window_end = now.saturating_add(self.policy.window());

		if self.policy.max_requests == 0 {
			return AdmissionDecision::Reject(RetryDirective {
				earliest_retry_at: window_end,
				recommended_backoff: self.policy.window(),
			});
		}

		windows.insert(key.clone(), WindowEntry { count: 1, window_end });

		AdmissionDecision::Admit
	}

	fn observe(&self, key: &AdmissionKey, decision: &AdmissionDecision) {
		let admitted = decision.is_admitted();

		if admitted {
			self.admitted.fetch_add(1, Ordering::Relaxed);
		} else {
			self.rejected.fetch_add(1, Ordering::Relaxed);

			obs::log_admission_rejection(key);
		}

		obs::record_admission(admitted);
	}
}
