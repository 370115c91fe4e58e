// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for session operations.
#[derive(Debug, Default)]
pub struct SessionMetrics {
	issued: AtomicU64,
	rotated: AtomicU64,
	rejected: AtomicU64,
	revoked: AtomicU64,
}
impl SessionMetrics {
	/// Returns the number of pairs issued on register or login.
	pub fn issued(&self) -> u64 {
		self.issued.load(Ordering::Relaxed)
	}

	/// Returns the number of successful refresh rotations.
	pub fn rotated(&self) -> u64 {
		self.rotated.load(Ordering::Relaxed)
	}

	/// Returns the number of calls refused on identity grounds.
	pub fn rejected(&self) -> u64 {
		self.rejected.load(Ordering::Relaxed)
	}

	/// Returns the number of refresh tokens revoked by logout or bulk revocation.
	pub fn revoked(&self) -> u64 {
		self.revoked.load(Ordering::Relaxed)
	}

	pub(crate) fn record_issued(&self) {
		self.issued.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rotated(&self) {
		self.rotated.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rejected(&self) {
		self.rejected.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_revoked(&self, count: u64) {
		self.revoked.fetch_add(count, Ordering::Relaxed);
	}
}
