//! Thread-safe in-memory [`RevocationLedger`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{RevocationRecord, SubjectId, TokenSecret},
	store::{RevocationLedger, RevokeOutcome, StoreError, StoreFuture},
};

type LedgerMap = Arc<RwLock<HashMap<String, RevocationRecord>>>;

/// Ledger double that keeps records in-process, keyed by token fingerprint.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger(LedgerMap);
impl MemoryLedger {
	/// Returns a snapshot of the record for `token`, if one was recorded.
	pub fn get(&self, token: &TokenSecret) -> Option<RevocationRecord> {
		self.0.read().get(&token.fingerprint()).cloned()
	}

	/// Number of records held, revoked ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` if nothing has been recorded.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn record_now(map: &LedgerMap, record: RevocationRecord) -> Result<(), StoreError> {
		let mut guard = map.write();

		if guard.contains_key(&record.token_hash) {
			return Err(StoreError::Conflict {
				message: "refresh token is already recorded".into(),
			});
		}

		guard.insert(record.token_hash.clone(), record);

		Ok(())
	}

	fn revoke_now(map: &LedgerMap, token_hash: &str, instant: OffsetDateTime) -> bool {
		map.write().get_mut(token_hash).is_some_and(|record| record.revoke(instant))
	}

	fn revoke_all_now(map: &LedgerMap, subject: &SubjectId, instant: OffsetDateTime) -> usize {
		let mut guard = map.write();
		let mut revoked = 0;

		for record in guard.values_mut().filter(|record| &record.subject == subject) {
			if record.revoke(instant) {
				revoked += 1;
			}
		}

		revoked
	}

	fn is_valid_now(map: &LedgerMap, token_hash: &str, instant: OffsetDateTime) -> bool {
		map.read().get(token_hash).is_some_and(|record| record.is_valid_at(instant))
	}

	fn revoke_if_valid_now(
		map: &LedgerMap,
		token_hash: &str,
		instant: OffsetDateTime,
	) -> RevokeOutcome {
		let mut guard = map.write();

		match guard.get_mut(token_hash) {
			Some(record) if record.is_valid_at(instant) => {
				record.revoke(instant);

				RevokeOutcome::Revoked
			},
			_ => RevokeOutcome::NotValid,
		}
	}
}
impl RevocationLedger for MemoryLedger {
	fn record(&self, record: RevocationRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::record_now(&map, record) })
	}

	fn revoke<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, bool> {
		let map = self.0.clone();
		let token_hash = token.fingerprint();

		Box::pin(async move { Ok(Self::revoke_now(&map, &token_hash, OffsetDateTime::now_utc())) })
	}

	fn revoke_all<'a>(&'a self, subject: &'a SubjectId) -> StoreFuture<'a, usize> {
		let map = self.0.clone();
		let subject = subject.to_owned();

		Box::pin(async move { Ok(Self::revoke_all_now(&map, &subject, OffsetDateTime::now_utc())) })
	}

	fn is_valid<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, bool> {
		let map = self.0.clone();
		let token_hash = token.fingerprint();

		Box::pin(async move { Ok(Self::is_valid_now(&map, &token_hash, OffsetDateTime::now_utc())) })
	}

	fn revoke_if_valid<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, RevokeOutcome> {
		let map = self.0.clone();
		let token_hash = token.fingerprint();

		Box::pin(async move {
			Ok(Self::revoke_if_valid_now(&map, &token_hash, OffsetDateTime::now_utc()))
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn recorded(token: &TokenSecret, expires_at: OffsetDateTime) -> MemoryLedger {
		let ledger = MemoryLedger::default();
		let subject = SubjectId::new("alice").expect("Subject fixture should be valid.");

		MemoryLedger::record_now(&ledger.0, RevocationRecord::new(subject, token, expires_at))
			.expect("Recording fixture should succeed.");

		ledger
	}

	#[tokio::test]
	async fn revoke_reports_whether_it_flipped() {
		let token = TokenSecret::new("refresh");
		let ledger = recorded(&token, OffsetDateTime::now_utc() + Duration::days(1));

		assert!(ledger.revoke(&token).await.expect("Revoking should succeed."));
		assert!(!ledger.revoke(&token).await.expect("Revoking again should succeed."));
		assert!(
			!ledger
				.revoke(&TokenSecret::new("never-issued"))
				.await
				.expect("Unknown revoke should succeed.")
		);
	}

	#[test]
	fn conditional_revoke_skips_expired_records() {
		let token = TokenSecret::new("refresh");
		let expires_at = macros::datetime!(2025-01-31 00:00 UTC);
		let ledger = recorded(&token, expires_at);
		let hash = token.fingerprint();

		assert_eq!(
			MemoryLedger::revoke_if_valid_now(&ledger.0, &hash, expires_at),
			RevokeOutcome::NotValid
		);
		assert_eq!(
			MemoryLedger::revoke_if_valid_now(&ledger.0, &hash, expires_at - Duration::seconds(1)),
			RevokeOutcome::Revoked
		);
		assert!(ledger.get(&token).is_some_and(|record| record.is_revoked()));
	}
}
