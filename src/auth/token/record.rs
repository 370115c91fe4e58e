//! Revocation ledger records and their lifecycle helpers.

// self
use crate::{
	_prelude::*,
	auth::{SubjectId, TokenSecret},
};

/// Current lifecycle status for a recorded refresh token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is recorded, not revoked, and not yet expired.
	Active,
	/// Token passed its expiry instant.
	Expired,
	/// Token was rotated away, logged out, or bulk revoked.
	Revoked,
}

/// Persisted entry for one issued refresh token.
///
/// Records are keyed by the token fingerprint; the raw token never reaches the ledger. The
/// revoked flag is monotonic: once set it is never cleared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRecord {
	/// Subject owning the refresh token.
	pub subject: SubjectId,
	/// Fingerprint of the refresh token (see [`TokenSecret::fingerprint`]).
	pub token_hash: String,
	/// Expiry copied from the verified token claims.
	pub expires_at: OffsetDateTime,
	/// Revocation instant if the record has been revoked.
	pub revoked_at: Option<OffsetDateTime>,
}
impl RevocationRecord {
	/// Creates an unrevoked record for `token`.
	pub fn new(subject: SubjectId, token: &TokenSecret, expires_at: OffsetDateTime) -> Self {
		Self { subject, token_hash: token.fingerprint(), expires_at, revoked_at: None }
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if self.revoked_at.is_some() {
			return TokenStatus::Revoked;
		}
		if instant >= self.expires_at {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record is usable for rotation at the provided instant.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Returns `true` if the record has been revoked.
	pub fn is_revoked(&self) -> bool {
		self.revoked_at.is_some()
	}

	/// Marks the record as revoked; returns `false` if it already was.
	pub fn revoke(&mut self, instant: OffsetDateTime) -> bool {
		if self.revoked_at.is_some() {
			return false;
		}

		self.revoked_at = Some(instant);

		true
	}
}
