//! Access/refresh pair returned by issuance and rotation.

// self
use crate::{
	_prelude::*,
	auth::{SubjectId, TokenSecret},
};

/// Freshly minted access + refresh tokens for one subject.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
	/// Subject both tokens were issued to.
	pub subject: SubjectId,
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Refresh token secret; already recorded in the ledger.
	pub refresh_token: TokenSecret,
	/// Expiry of the access token.
	pub access_expires_at: OffsetDateTime,
	/// Expiry of the refresh token, as recorded in the ledger.
	pub refresh_expires_at: OffsetDateTime,
}
impl Debug for TokenPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenPair")
			.field("subject", &self.subject)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("access_expires_at", &self.access_expires_at)
			.field("refresh_expires_at", &self.refresh_expires_at)
			.finish()
	}
}
