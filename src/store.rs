//! Revocation ledger contract and built-in ledger implementations.
//!
//! The session manager depends only on [`RevocationLedger`]; every call is treated as blocking
//! I/O that may fail independently of token verification. Implementations must not cache
//! validity: each [`RevocationLedger::is_valid`] answer reflects the store at call time.

pub mod file;
pub mod memory;

pub use file::FileLedger;
pub use memory::MemoryLedger;

// self
use crate::{
	_prelude::*,
	auth::{RevocationRecord, SubjectId, TokenSecret},
};

/// Boxed future returned by ledger and user-store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for issued refresh tokens.
pub trait RevocationLedger
where
	Self: Send + Sync,
{
	/// Persists a new record. Recording a fingerprint that already exists is a
	/// [`StoreError::Conflict`].
	fn record(&self, record: RevocationRecord) -> StoreFuture<'_, ()>;

	/// Marks the token as revoked, returning `true` if this call flipped the record.
	///
	/// Unknown and already-revoked tokens are not an error; they report `false`.
	fn revoke<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, bool>;

	/// Revokes every unrevoked record owned by `subject`, returning how many flipped.
	fn revoke_all<'a>(&'a self, subject: &'a SubjectId) -> StoreFuture<'a, usize>;

	/// Returns `true` iff a record exists, is not revoked, and has not expired right now.
	///
	/// Unknown tokens are reported as invalid rather than as an error.
	fn is_valid<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, bool>;

	/// Revokes the token only if it is still valid.
	///
	/// The default implementation checks then revokes in two calls, leaving a narrow window in
	/// which two callers can both observe [`RevokeOutcome::Revoked`]. Backends that can make the
	/// check and the write atomic should override it.
	fn revoke_if_valid<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, RevokeOutcome> {
		Box::pin(async move {
			if !self.is_valid(token).await? {
				return Ok(RevokeOutcome::NotValid);
			}

			if self.revoke(token).await? {
				Ok(RevokeOutcome::Revoked)
			} else {
				Ok(RevokeOutcome::NotValid)
			}
		})
	}
}

/// Result of a conditional revocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevokeOutcome {
	/// The token was valid and this call revoked it.
	Revoked,
	/// The token was unknown, expired, or already revoked; nothing changed.
	NotValid,
}

/// Error type produced by [`RevocationLedger`] and user-store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine (unavailable, timed out).
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A unique key already exists.
	#[error("Conflict: {message}.")]
	Conflict {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	/// Ledger that only implements the required methods so the default conditional revoke is
	/// exercised.
	#[derive(Default)]
	struct PlainLedger {
		inner: MemoryLedger,
		revokes: AtomicUsize,
	}
	impl RevocationLedger for PlainLedger {
		fn record(&self, record: RevocationRecord) -> StoreFuture<'_, ()> {
			self.inner.record(record)
		}

		fn revoke<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, bool> {
			self.revokes.fetch_add(1, Ordering::Relaxed);
			self.inner.revoke(token)
		}

		fn revoke_all<'a>(&'a self, subject: &'a SubjectId) -> StoreFuture<'a, usize> {
			self.inner.revoke_all(subject)
		}

		fn is_valid<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, bool> {
			self.inner.is_valid(token)
		}
	}

	#[tokio::test]
	async fn default_conditional_revoke_checks_before_writing() {
		let ledger = PlainLedger::default();
		let token = TokenSecret::new("refresh");
		let subject = SubjectId::new("alice").expect("Subject fixture should be valid.");

		ledger
			.record(RevocationRecord::new(
				subject,
				&token,
				OffsetDateTime::now_utc() + Duration::days(1),
			))
			.await
			.expect("Recording fixture should succeed.");

		assert_eq!(
			ledger.revoke_if_valid(&token).await.expect("First revoke should succeed."),
			RevokeOutcome::Revoked
		);
		assert_eq!(
			ledger.revoke_if_valid(&token).await.expect("Second revoke should succeed."),
			RevokeOutcome::NotValid
		);
		assert_eq!(
			ledger
				.revoke_if_valid(&TokenSecret::new("never-issued"))
				.await
				.expect("Unknown revoke should succeed."),
			RevokeOutcome::NotValid
		);
		assert_eq!(ledger.revokes.load(Ordering::Relaxed), 1);
	}

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn revoke_outcome_can_be_serialized() {
		let payload = serde_json::to_string(&RevokeOutcome::NotValid)
			.expect("RevokeOutcome should serialize to JSON.");

		assert_eq!(payload, "\"NotValid\"");
	}
}
